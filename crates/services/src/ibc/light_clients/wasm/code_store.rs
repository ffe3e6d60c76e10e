// Path: crates/services/src/ibc/light_clients/wasm/code_store.rs

//! Content-addressed storage of light-client modules.

use ioi_lc_api::state::StateAccess;
use ioi_lc_api::vm::VirtualMachine;
use ioi_lc_crypto::algorithms::hash::checksum_of;
use ioi_lc_types::error::CodeError;
use ioi_lc_types::ibc::Checksum;
use ioi_lc_types::keys::{wasm_code_key, WASM_CODE_PREFIX};
use std::io::Read;
use std::sync::Arc;

/// The frame magic number of a zstd-compressed upload.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Returns the module bytes of an upload, decompressing zstd frames.
///
/// The size cap applies to the decompressed output, so a small compressed
/// upload cannot expand past `max_code_size`.
pub fn unpack_module(code: &[u8], max_code_size: usize) -> Result<Vec<u8>, CodeError> {
    if !code.starts_with(&ZSTD_MAGIC) {
        if code.len() > max_code_size {
            return Err(CodeError::TooLarge {
                size: code.len(),
                max: max_code_size,
            });
        }
        return Ok(code.to_vec());
    }
    let decoder =
        zstd::stream::read::Decoder::new(code).map_err(|e| CodeError::Decompress(e.to_string()))?;
    let mut out = Vec::new();
    // One byte past the cap is enough to detect an oversized module.
    decoder
        .take(max_code_size as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| CodeError::Decompress(e.to_string()))?;
    if out.len() > max_code_size {
        return Err(CodeError::TooLarge {
            size: out.len(),
            max: max_code_size,
        });
    }
    Ok(out)
}

/// Stores module bytes under `ibc::wasm::code::<checksum>`.
///
/// A record is only ever written by [`CodeStore::put`] after the bytes have
/// been validated against the sandbox, so every checksum found here refers to
/// a loadable module.
pub struct CodeStore {
    vm: Arc<dyn VirtualMachine>,
    max_code_size: usize,
}

impl CodeStore {
    pub fn new(vm: Arc<dyn VirtualMachine>, max_code_size: usize) -> Self {
        Self { vm, max_code_size }
    }

    pub fn max_code_size(&self) -> usize {
        self.max_code_size
    }

    /// Validates and stores a module, returning its checksum.
    ///
    /// Storing bytes that are already present is a no-op returning the same checksum.
    pub fn put(&self, state: &mut dyn StateAccess, code: &[u8]) -> Result<Checksum, CodeError> {
        if code.is_empty() {
            return Err(CodeError::Empty);
        }
        let module = unpack_module(code, self.max_code_size)?;
        if module.is_empty() {
            return Err(CodeError::Empty);
        }
        let checksum = checksum_of(&module);
        let key = wasm_code_key(&checksum);
        if state.get(&key)?.is_some() {
            tracing::debug!(target: "ibc_wasm", %checksum, "module already stored");
            return Ok(checksum);
        }
        self.vm
            .validate(&module)
            .map_err(|e| CodeError::InvalidModule(e.to_string()))?;
        state.insert(&key, &module)?;
        tracing::info!(target: "ibc_wasm", %checksum, size = module.len(), "stored module");
        Ok(checksum)
    }

    /// Loads the module bytes for `checksum`, re-verifying their digest.
    pub fn get(&self, state: &dyn StateAccess, checksum: &Checksum) -> Result<Vec<u8>, CodeError> {
        let code = state
            .get(&wasm_code_key(checksum))?
            .ok_or(CodeError::NotFound(*checksum))?;
        if checksum_of(&code) != *checksum {
            return Err(CodeError::Corrupted(*checksum));
        }
        Ok(code)
    }

    pub fn has(&self, state: &dyn StateAccess, checksum: &Checksum) -> Result<bool, CodeError> {
        Ok(state.get(&wasm_code_key(checksum))?.is_some())
    }

    /// Lists every stored checksum in ascending order.
    pub fn checksums(&self, state: &dyn StateAccess) -> Result<Vec<Checksum>, CodeError> {
        let mut out = Vec::new();
        for item in state.prefix_scan(WASM_CODE_PREFIX)? {
            let (key, _) = item?;
            if let Some(checksum) = key
                .get(WASM_CODE_PREFIX.len()..)
                .and_then(Checksum::from_slice)
            {
                out.push(checksum);
            }
        }
        Ok(out)
    }

    /// Deletes a module record. Fails `NotFound` if it is absent.
    pub fn remove(&self, state: &mut dyn StateAccess, checksum: &Checksum) -> Result<(), CodeError> {
        if !self.has(state, checksum)? {
            return Err(CodeError::NotFound(*checksum));
        }
        state.delete(&wasm_code_key(checksum))?;
        tracing::info!(target: "ibc_wasm", %checksum, "removed module");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioi_lc_api::state::MemoryStore;
    use ioi_lc_test_utils::mock_client::{MOCK_CLIENT_V1, MOCK_CLIENT_V2};
    use ioi_lc_test_utils::MockLightClientVm;

    fn store(max: usize) -> CodeStore {
        CodeStore::new(Arc::new(MockLightClientVm::new()), max)
    }

    #[test]
    fn put_is_idempotent() {
        let codes = store(1024);
        let mut state = MemoryStore::new();
        let first = codes.put(&mut state, MOCK_CLIENT_V1).unwrap();
        let snapshot = state.clone();
        let second = codes.put(&mut state, MOCK_CLIENT_V1).unwrap();
        assert_eq!(first, second);
        assert_eq!(state, snapshot);
        assert_eq!(codes.checksums(&state).unwrap(), vec![first]);
        assert_eq!(codes.get(&state, &first).unwrap(), MOCK_CLIENT_V1);
    }

    #[test]
    fn put_rejects_empty_oversized_and_invalid_modules() {
        let codes = store(8);
        let mut state = MemoryStore::new();
        assert!(matches!(codes.put(&mut state, b""), Err(CodeError::Empty)));
        assert!(matches!(
            codes.put(&mut state, MOCK_CLIENT_V1),
            Err(CodeError::TooLarge { size: 10, max: 8 })
        ));
        assert!(matches!(
            store(1024).put(&mut state, b"garbage"),
            Err(CodeError::InvalidModule(_))
        ));
        assert!(state.is_empty());
    }

    #[test]
    fn compressed_upload_is_stored_uncompressed() {
        let codes = store(1024);
        let mut state = MemoryStore::new();
        let compressed = zstd::encode_all(MOCK_CLIENT_V2, 3).unwrap();
        assert!(compressed.starts_with(&ZSTD_MAGIC));
        let checksum = codes.put(&mut state, &compressed).unwrap();
        assert_eq!(checksum, checksum_of(MOCK_CLIENT_V2));
        assert_eq!(codes.get(&state, &checksum).unwrap(), MOCK_CLIENT_V2);
    }

    #[test]
    fn compressed_upload_is_capped_after_decompression() {
        let codes = store(1024);
        let mut state = MemoryStore::new();
        let bomb = zstd::encode_all(&vec![0u8; 4096][..], 19).unwrap();
        assert!(bomb.len() < 1024);
        assert!(matches!(
            codes.put(&mut state, &bomb),
            Err(CodeError::TooLarge { size: 1025, max: 1024 })
        ));
    }

    #[test]
    fn get_detects_missing_and_corrupted_records() {
        let codes = store(1024);
        let mut state = MemoryStore::new();
        let missing = checksum_of(b"never stored");
        assert!(matches!(codes.get(&state, &missing), Err(CodeError::NotFound(c)) if c == missing));
        assert!(!codes.has(&state, &missing).unwrap());

        let checksum = codes.put(&mut state, MOCK_CLIENT_V1).unwrap();
        state.insert(&wasm_code_key(&checksum), MOCK_CLIENT_V2).unwrap();
        assert!(matches!(codes.get(&state, &checksum), Err(CodeError::Corrupted(_))));
    }

    #[test]
    fn remove_deletes_the_record() {
        let codes = store(1024);
        let mut state = MemoryStore::new();
        let checksum = codes.put(&mut state, MOCK_CLIENT_V1).unwrap();
        codes.remove(&mut state, &checksum).unwrap();
        assert!(!codes.has(&state, &checksum).unwrap());
        assert!(matches!(codes.remove(&mut state, &checksum), Err(CodeError::NotFound(_))));
    }
}
