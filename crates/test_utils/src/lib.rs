// Path: crates/test_utils/src/lib.rs
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

//! # IOI Light-Client Test Utilities
//!
//! A native mock light-client VM speaking the JSON call ABI, WAT fixtures for
//! the wasmtime engine, and assertion helpers.

pub mod assertions;
pub mod fixtures;
pub mod mock_client;

pub use mock_client::MockLightClientVm;
