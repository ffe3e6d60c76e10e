// Path: crates/api/src/lib.rs

//! # IOI Light-Client API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
//! # IOI Light-Client API
//!
//! Core traits and interfaces for the WASM light-client host. This crate defines
//! the stable seams between the host state machine, the key-value backend and
//! the sandboxed execution engine.

/// Re-exports all core error types from the central `ioi-lc-types` crate.
pub mod error;
/// Core traits for state access: `StateAccess`, overlays and client namespaces.
pub mod state;
/// Defines the core `VirtualMachine` trait and the light-client module ABI.
pub mod vm;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::error::{ClientError, CodeError, ErrorCode, InvokeError, StateError, VmError};
    pub use crate::state::{ClientStore, MemoryStore, StateAccess, StateOverlay, SubstituteStore};
    pub use crate::vm::{EntryPoint, ExecutionContext, ExecutionOutput, VirtualMachine};
}
