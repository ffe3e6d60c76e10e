//! Assertion helpers for light-client host tests.

use ioi_lc_api::state::{MemoryStore, StateAccess};

/// Assert that an expression evaluates to `Err` matching a pattern, and yield the error.
#[macro_export]
macro_rules! assert_err_matches {
    ($expr:expr, $pattern:pat $(if $guard:expr)? $(,)?) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(err) => {
                assert!(
                    matches!(err, $pattern $(if $guard)?),
                    "Unexpected error: {:?}",
                    err
                );
                err
            }
        }
    };
}

/// Collects every entry of `store` under `prefix` as owned pairs, in key order.
pub fn dump_prefix(store: &MemoryStore, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    store
        .entries_with_prefix(prefix)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Returns true if `key` is present in `state`. Backend errors count as absent.
pub fn has_key(state: &dyn StateAccess, key: &[u8]) -> bool {
    matches!(state.get(key), Ok(Some(_)))
}
