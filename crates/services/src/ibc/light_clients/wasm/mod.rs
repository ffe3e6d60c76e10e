// Path: crates/services/src/ibc/light_clients/wasm/mod.rs

//! The `08-wasm` light-client host.
//!
//! Light-client verification logic ships as sandboxed modules addressed by
//! checksum. This module stores those modules, binds client instances to them
//! and drives every light-client operation through the [`SandboxInvoker`].
//! Each operation that writes state does so through a [`StateOverlay`] and
//! commits with a single `batch_apply`, so a failed operation leaves no trace.

pub mod client_state;
pub mod code_store;
pub mod consensus_state;
pub mod invoker;
pub mod msgs;

pub use client_state::{ProofRequest, UpgradeRequest, VerifiedClientMessage, WasmClient, WasmClientState};
pub use code_store::{unpack_module, CodeStore};
pub use consensus_state::WasmConsensusState;
pub use invoker::{SandboxInvoker, StoreScope};

use ioi_lc_api::state::{StateAccess, StateOverlay};
use ioi_lc_api::vm::VirtualMachine;
use ioi_lc_types::app::BlockEnv;
use ioi_lc_types::codec;
use ioi_lc_types::config::WasmConfig;
use ioi_lc_types::error::{ClientError, CoreError, InvokeError, StateError};
use ioi_lc_types::ibc::{Checksum, ClientId, Height, Status, WASM_CLIENT_TYPE};
use ioi_lc_types::keys::{CLIENT_CHECKSUM_KEY, CLIENT_STORE_PREFIX, NEXT_CLIENT_SEQUENCE_KEY};
use msgs::{CallMsg, EmptyResult};
use std::sync::Arc;

/// Errors that can carry the halt of a module answering outside the call schema.
pub(crate) trait HaltedModule {
    fn halted_module(&self) -> Option<&Checksum>;
}

impl HaltedModule for InvokeError {
    fn halted_module(&self) -> Option<&Checksum> {
        match self {
            InvokeError::SchemaMismatch { checksum, .. } => Some(checksum),
            _ => None,
        }
    }
}

impl HaltedModule for ClientError {
    fn halted_module(&self) -> Option<&Checksum> {
        match self {
            ClientError::Invoke(e) => e.halted_module(),
            _ => None,
        }
    }
}

impl HaltedModule for CoreError {
    fn halted_module(&self) -> Option<&Checksum> {
        match self {
            CoreError::Client(e) => e.halted_module(),
            _ => None,
        }
    }
}

impl HaltedModule for StateError {
    fn halted_module(&self) -> Option<&Checksum> {
        None
    }
}

/// Runs `f` against an overlay of `state` and commits its writes with one
/// `batch_apply` only if `f` succeeds.
///
/// On failure the overlay is discarded, except that a module halted by a
/// schema mismatch is still recorded in `state`.
pub(crate) fn atomically<T, E>(
    state: &mut dyn StateAccess,
    f: impl FnOnce(&mut StateOverlay<'_>) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StateError> + HaltedModule,
{
    let mut overlay = StateOverlay::new(&*state);
    match f(&mut overlay) {
        Ok(value) => {
            let (inserts, deletes) = overlay.into_ordered_batch();
            state.batch_apply(&inserts, &deletes)?;
            Ok(value)
        }
        Err(e) => {
            drop(overlay);
            if let Some(checksum) = e.halted_module() {
                invoker::record_quarantine(state, checksum)?;
            }
            Err(e)
        }
    }
}

/// What an accepted client message did to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A header was applied at these heights.
    Updated(Vec<Height>),
    /// Misbehaviour was detected and the client is now frozen.
    Frozen,
}

/// The host-side entry point of the `08-wasm` client type.
pub struct WasmLightClientModule {
    code_store: Arc<CodeStore>,
    invoker: SandboxInvoker,
}

impl WasmLightClientModule {
    pub fn new(vm: Arc<dyn VirtualMachine>, config: &WasmConfig) -> Self {
        let code_store = Arc::new(CodeStore::new(vm.clone(), config.max_code_size));
        let invoker = SandboxInvoker::new(vm, code_store.clone(), config.gas_limits.clone());
        Self { code_store, invoker }
    }

    pub fn code_store(&self) -> &CodeStore {
        &self.code_store
    }

    pub fn invoker(&self) -> &SandboxInvoker {
        &self.invoker
    }

    /// Binds a handle to an existing client. Fails `ClientNotFound` if the
    /// client was never initialized.
    pub fn client(
        &self,
        state: &dyn StateAccess,
        client_id: &ClientId,
        env: BlockEnv,
    ) -> Result<WasmClient<'_>, ClientError> {
        let checksum = client_state::load_checksum(state, client_id)?
            .ok_or_else(|| ClientError::ClientNotFound(client_id.clone()))?;
        Ok(WasmClient::new(&self.invoker, client_id.clone(), checksum, env))
    }

    /// Every initialized client with the checksum it runs, ordered by key.
    pub fn clients(&self, state: &dyn StateAccess) -> Result<Vec<(ClientId, Checksum)>, ClientError> {
        let mut out = Vec::new();
        for item in state.prefix_scan(CLIENT_STORE_PREFIX)? {
            let (key, value) = item?;
            let Some(rest) = key.get(CLIENT_STORE_PREFIX.len()..) else {
                continue;
            };
            let Some(slash) = rest.iter().position(|b| *b == b'/') else {
                continue;
            };
            let (id, suffix) = rest.split_at(slash);
            if suffix.get(1..) != Some(CLIENT_CHECKSUM_KEY) {
                continue;
            }
            let client_id = std::str::from_utf8(id)
                .map_err(|e| ClientError::InvalidClientId(e.to_string()))?
                .parse::<ClientId>()?;
            out.push((client_id, codec::from_bytes_canonical(&value)?));
        }
        Ok(out)
    }

    /// Allocates the next free `08-wasm-<n>` identifier and initializes a
    /// client under it. Identifiers are never reassigned.
    pub fn create_client(
        &self,
        state: &mut dyn StateAccess,
        env: BlockEnv,
        client_state: &WasmClientState,
        consensus_state: &WasmConsensusState,
    ) -> Result<ClientId, ClientError> {
        atomically(state, |overlay| {
            let mut sequence = match overlay.get(NEXT_CLIENT_SEQUENCE_KEY)? {
                Some(raw) => codec::from_bytes_canonical::<u64>(&raw)?,
                None => 0,
            };
            let client_id = loop {
                let candidate = ClientId::new(WASM_CLIENT_TYPE, sequence)?;
                sequence = sequence.saturating_add(1);
                if client_state::load_checksum(&*overlay, &candidate)?.is_none() {
                    break candidate;
                }
            };
            overlay.insert(NEXT_CLIENT_SEQUENCE_KEY, &codec::to_bytes_canonical(&sequence))?;
            self.initialize(overlay, env, &client_id, client_state, consensus_state)?;
            Ok(client_id)
        })
    }

    /// Initializes a client under an identifier drawn by [`Self::create_client`].
    ///
    /// The host records the checksum and latest height, stores both opaque
    /// blobs, then lets the module validate them through `instantiate`. The
    /// client must report `Active` afterwards; otherwise nothing is written.
    pub(crate) fn initialize(
        &self,
        state: &mut dyn StateAccess,
        env: BlockEnv,
        client_id: &ClientId,
        client_state: &WasmClientState,
        consensus_state: &WasmConsensusState,
    ) -> Result<(), ClientError> {
        if client_id.client_type() != WASM_CLIENT_TYPE {
            return Err(ClientError::InvalidClientId(format!(
                "{} is not a {} client",
                client_id, WASM_CLIENT_TYPE
            )));
        }
        if client_state::load_checksum(&*state, client_id)?.is_some() {
            return Err(ClientError::ClientAlreadyExists(client_id.clone()));
        }
        if client_state.latest_height.is_zero() {
            return Err(ClientError::InvalidClientState("latest height is zero".into()));
        }
        if client_state.data.is_empty() {
            return Err(ClientError::InvalidClientState("client state is empty".into()));
        }
        if consensus_state.data.is_empty() {
            return Err(ClientError::InvalidConsensusState("consensus state is empty".into()));
        }
        let checksum = client_state.checksum;
        let stored = self
            .code_store
            .has(&*state, &checksum)
            .map_err(|e| ClientError::Invoke(InvokeError::Host(e.to_string())))?;
        if !stored {
            return Err(ClientError::ChecksumNotFound(checksum));
        }

        atomically(state, |overlay| {
            client_state::store_checksum(overlay, client_id, &checksum)?;
            client_state::store_latest_height(overlay, client_id, &client_state.latest_height)?;
            client_state::store_client_data(overlay, client_id, &client_state.data)?;
            consensus_state.store(overlay, client_id, &client_state.latest_height)?;

            let msg = CallMsg::Instantiate {
                client_state: client_state.data.clone(),
                consensus_state: consensus_state.data.clone(),
                checksum,
            };
            self.invoker
                .call::<EmptyResult>(overlay, StoreScope::Client(client_id), &checksum, &msg, &env)
                .map_err(|e| match e {
                    InvokeError::Rejected(reason) => ClientError::InvalidClientState(reason),
                    other => ClientError::Invoke(other),
                })?;

            let client = WasmClient::new(&self.invoker, client_id.clone(), checksum, env);
            client.require_status(&*overlay, &[Status::Active])?;
            Ok::<(), ClientError>(())
        })?;
        tracing::info!(target: "ibc_wasm", %client_id, %checksum, "initialized client");
        Ok(())
    }

    /// Verifies a client message and either applies it or freezes the client
    /// on misbehaviour. Only an `Active` client accepts messages.
    pub fn update_client(
        &self,
        state: &mut dyn StateAccess,
        env: BlockEnv,
        client_id: &ClientId,
        client_message: &[u8],
    ) -> Result<UpdateOutcome, ClientError> {
        atomically(state, |overlay| {
            let client = self.client(&*overlay, client_id, env)?;
            client.require_status(&*overlay, &[Status::Active])?;
            let verified = client.verify_client_message(&*overlay, client_message)?;
            if client.check_for_misbehaviour(overlay, &verified)? {
                client.update_state_on_misbehaviour(overlay, verified)?;
                return Ok(UpdateOutcome::Frozen);
            }
            client.update_state(overlay, verified).map(UpdateOutcome::Updated)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioi_lc_api::state::MemoryStore;
    use ioi_lc_test_utils::mock_client::{self, MOCK_CLIENT_V1};
    use ioi_lc_test_utils::MockLightClientVm;

    fn module() -> WasmLightClientModule {
        WasmLightClientModule::new(Arc::new(MockLightClientVm::new()), &WasmConfig::default())
    }

    #[test]
    fn atomically_discards_writes_on_error() {
        let mut state = MemoryStore::new();
        let result: Result<(), StateError> = atomically(&mut state, |overlay| {
            overlay.insert(b"a", b"1")?;
            Err(StateError::Backend("boom".into()))
        });
        assert!(result.is_err());
        assert!(state.is_empty());
    }

    fn genesis(checksum: Checksum) -> (WasmClientState, WasmConsensusState) {
        (
            WasmClientState::new(
                mock_client::client_state_bytes("chain-a", Height::new(0, 1), 1_000),
                checksum,
                Height::new(0, 1),
            ),
            WasmConsensusState::new(mock_client::consensus_state_bytes(100, b"root")),
        )
    }

    #[test]
    fn create_client_allocates_sequential_identifiers() {
        let module = module();
        let mut state = MemoryStore::new();
        let checksum = module.code_store().put(&mut state, MOCK_CLIENT_V1).unwrap();
        let env = BlockEnv::new(1, 100);
        let (client_state, consensus_state) = genesis(checksum);

        let first = module
            .create_client(&mut state, env, &client_state, &consensus_state)
            .unwrap();
        let second = module
            .create_client(&mut state, env, &client_state, &consensus_state)
            .unwrap();
        assert_eq!(first.as_str(), "08-wasm-0");
        assert_eq!(second.as_str(), "08-wasm-1");
        assert_eq!(
            module.clients(&state).unwrap(),
            vec![(first, checksum), (second, checksum)]
        );
    }

    #[test]
    fn create_client_skips_identifiers_already_in_use() {
        let module = module();
        let mut state = MemoryStore::new();
        let checksum = module.code_store().put(&mut state, MOCK_CLIENT_V1).unwrap();
        let env = BlockEnv::new(1, 100);
        let (client_state, consensus_state) = genesis(checksum);
        let taken: ClientId = "08-wasm-0".parse().unwrap();
        module
            .initialize(&mut state, env, &taken, &client_state, &consensus_state)
            .unwrap();

        for expected in ["08-wasm-1", "08-wasm-2"] {
            let id = module
                .create_client(&mut state, env, &client_state, &consensus_state)
                .unwrap();
            assert_eq!(id.as_str(), expected);
        }
        assert_eq!(
            state.get(NEXT_CLIENT_SEQUENCE_KEY).unwrap(),
            Some(codec::to_bytes_canonical(&3u64))
        );
        assert_eq!(module.clients(&state).unwrap().len(), 3);
    }

    #[test]
    fn initialize_rejects_taken_and_foreign_identifiers() {
        let module = module();
        let mut state = MemoryStore::new();
        let checksum = module.code_store().put(&mut state, MOCK_CLIENT_V1).unwrap();
        let env = BlockEnv::new(1, 100);
        let (client_state, consensus_state) = genesis(checksum);
        let id = module
            .create_client(&mut state, env, &client_state, &consensus_state)
            .unwrap();
        let before = state.clone();

        let err = module
            .initialize(&mut state, env, &id, &client_state, &consensus_state)
            .unwrap_err();
        assert!(matches!(err, ClientError::ClientAlreadyExists(_)));

        let foreign: ClientId = "07-tendermint-0".parse().unwrap();
        let err = module
            .initialize(&mut state, env, &foreign, &client_state, &consensus_state)
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidClientId(_)));
        assert_eq!(state, before);
    }
}
