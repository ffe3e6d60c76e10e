// Path: crates/types/src/keys/mod.rs
//! Defines constants for well-known state keys.
//!
//! These constants provide a single source of truth for the two logical tables
//! the host persists: the content-addressed code store and the per-client
//! namespaced stores. Keys that are built from an identifier have a builder
//! function next to their prefix.

use crate::ibc::{Checksum, ClientId, Height};

/// State key prefix for light-client module bytes, keyed by the raw checksum.
pub const WASM_CODE_PREFIX: &[u8] = b"ibc::wasm::code::";

/// State key prefix under which every client namespace lives.
pub const CLIENT_STORE_PREFIX: &[u8] = b"ibc::clients::";

/// State key for the next client sequence number used to allocate client identifiers.
pub const NEXT_CLIENT_SEQUENCE_KEY: &[u8] = b"ibc::wasm::nextClientSequence";

/// Namespace-relative key prefix reserved for host-owned records.
///
/// Modules may read keys under this prefix but never write them.
pub const HOST_RESERVED_PREFIX: &[u8] = b"host/";

/// Namespace-relative key of the checksum the client currently runs.
pub const CLIENT_CHECKSUM_KEY: &[u8] = b"host/checksum";

/// Namespace-relative key of the latest height the client has been updated to.
pub const CLIENT_LATEST_HEIGHT_KEY: &[u8] = b"host/latestHeight";

/// Namespace-relative key of every checksum the client has run, oldest first.
pub const CLIENT_CHECKSUM_HISTORY_KEY: &[u8] = b"host/checksumHistory";

/// Namespace-relative key of the module-owned client state blob.
pub const CLIENT_STATE_KEY: &[u8] = b"clientState";

/// Namespace-relative key prefix of the module-owned consensus state blobs.
pub const CONSENSUS_STATE_PREFIX: &[u8] = b"consensusStates/";

/// Prefix that routes substitute-recovery keys to the subject client's namespace.
pub const SUBJECT_STORE_PREFIX: &[u8] = b"subject/";

/// Prefix that routes substitute-recovery keys to the substitute client's namespace.
pub const SUBSTITUTE_STORE_PREFIX: &[u8] = b"substitute/";

/// Prefix of the records halting modules that answered outside the call schema.
pub const QUARANTINE_PREFIX: &[u8] = b"ibc::wasm::quarantine::";

/// Builds the quarantine record key for a checksum.
pub fn quarantine_key(checksum: &Checksum) -> Vec<u8> {
    [QUARANTINE_PREFIX, checksum.as_bytes().as_slice()].concat()
}

/// Builds the code-store key for a checksum.
pub fn wasm_code_key(checksum: &Checksum) -> Vec<u8> {
    [WASM_CODE_PREFIX, checksum.as_bytes().as_slice()].concat()
}

/// Builds the absolute namespace prefix of a client store: `ibc::clients::<id>/`.
///
/// Client identifiers cannot contain `/`, so the trailing separator keeps
/// `08-wasm-1/` and `08-wasm-10/` disjoint.
pub fn client_store_prefix(client_id: &ClientId) -> Vec<u8> {
    [CLIENT_STORE_PREFIX, client_id.as_str().as_bytes(), b"/".as_slice()].concat()
}

/// Builds the namespace-relative key of the consensus state at `height`.
pub fn consensus_state_key(height: &Height) -> Vec<u8> {
    [CONSENSUS_STATE_PREFIX, height.to_string().as_bytes()].concat()
}
