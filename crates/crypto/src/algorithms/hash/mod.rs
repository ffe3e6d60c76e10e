// Path: crates/crypto/src/algorithms/hash/mod.rs
//! SHA-256 content hashing.

use ioi_lc_types::ibc::Checksum;
use sha2::{Digest, Sha256};

/// Hashes `data` with SHA-256.
pub fn sha256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Sha256::digest(data.as_ref()).into()
}

/// Hashes the concatenation of several byte slices with SHA-256 without
/// allocating the concatenation.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Derives the checksum of uncompressed module bytes.
pub fn checksum_of(code: &[u8]) -> Checksum {
    Checksum::new(sha256(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            hex_of(&sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn concat_matches_single_buffer() {
        assert_eq!(sha256_concat(&[b"ab", b"", b"c"]), sha256(b"abc"));
    }

    #[test]
    fn checksum_is_content_addressed() {
        let a = checksum_of(b"\0asm module");
        let b = checksum_of(b"\0asm module");
        let c = checksum_of(b"\0asm module v2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    fn hex_of(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
