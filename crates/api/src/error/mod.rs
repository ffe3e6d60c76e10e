// Path: crates/api/src/error/mod.rs
// Re-export all core error types from the central types crate.
pub use ioi_lc_types::error::{
    ClientError, CodeError, CoreError, ErrorCode, GovernanceError, InvokeError, StateError,
    UpgradeError, VmError,
};
pub use ioi_lc_types::Result;
