// Path: crates/telemetry/src/lib.rs
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

//! # IOI Light-Client Telemetry
//!
//! Structured logging initialization for binaries embedding the light-client
//! host. Library crates only emit `tracing` events (targets `ibc_wasm`,
//! `governance`, `storage`) and `log` records (target `wasm_vm`); this crate
//! installs the subscriber that renders them.

/// The initialization routine for global structured logging.
pub mod init;

pub use init::{init_tracing, LogFormat};
