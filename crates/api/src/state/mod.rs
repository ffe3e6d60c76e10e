// Path: crates/api/src/state/mod.rs
//! Core traits for state access.
//!
//! - `StateAccess`: the dyn-safe key-value interface every store implements.
//! - `StateOverlay`: a copy-on-write buffer used to make a call all-or-nothing.
//! - `ClientStore` / `SubstituteStore`: prefix-scoped handles that confine a
//!   light-client module to its own namespace.
//! - `MemoryStore`: an ordered in-memory backend.

use ioi_lc_types::error::StateError;
use std::sync::Arc;

// --- Type Aliases for common state patterns ---
/// An atomically reference-counted, owned key slice.
pub type StateKey = Arc<[u8]>;
/// An atomically reference-counted, owned value slice.
pub type StateVal = Arc<[u8]>;
/// An owned key-value pair from the state, using cheap-to-clone Arcs.
pub type StateKVPair = (StateKey, StateVal);
/// A streaming iterator over key-value pairs from the state, in ascending key order.
pub type StateScanIter<'a> = Box<dyn Iterator<Item = Result<StateKVPair, StateError>> + Send + 'a>;

// --- Module Structure ---

mod accessor;
mod memory;
pub mod namespaced;
mod overlay;

// --- Public Exports ---

pub use accessor::*;
pub use memory::MemoryStore;
pub use namespaced::{ClientStore, SubstituteStore};
pub use overlay::*;

/// Calculates the smallest byte vector that is strictly greater than all keys
/// starting with the given prefix. Returns None if the prefix is empty or all 0xFF bytes.
pub fn next_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    if prefix.is_empty() {
        return None;
    }
    let mut ub = prefix.to_vec();
    for i in (0..ub.len()).rev() {
        if let Some(byte) = ub.get_mut(i) {
            if *byte != 0xFF {
                *byte += 1;
                ub.truncate(i + 1);
                return Some(ub);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests;
