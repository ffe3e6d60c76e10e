// Path: crates/services/src/lib.rs
#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

//! # IOI WASM Light-Client Services
//!
//! The host side of the 08-wasm light client: a content-addressed code store,
//! a sandbox invoker that runs module calls all-or-nothing, the client and
//! consensus state wrappers implementing the uniform light-client contract,
//! and the governance gateway for uploads, migrations and recovery.

pub mod governance;
pub mod ibc;
