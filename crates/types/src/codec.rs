// Path: crates/types/src/codec.rs

//! Defines the canonical, deterministic binary codec for host-persisted records.
//!
//! Records the host owns (client checksum pointers, latest heights, checksum
//! history) are written with `parity-scale-codec` (SCALE). Module-owned blobs are
//! never passed through this codec; the host stores them byte-for-byte.

use crate::error::StateError;
use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical SCALE byte representation.
///
/// Trailing bytes are rejected, so a record that decodes is exactly the record
/// that was written.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, StateError> {
    T::decode_all(&mut &*b).map_err(|e| StateError::Decode(format!("canonical decode failed: {}", e)))
}
