// Path: crates/cli/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # IOI Light-Client CLI Library
//!
//! The operator commands behind the `ioi-lc` binary. Every command opens the
//! redb state file, builds the host exactly as an embedding chain would
//! (wasmtime runtime, code store, governance gateway) and drives it through
//! its public API only.

pub mod commands;
pub mod util;
