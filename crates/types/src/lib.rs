// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # IOI Light-Client Host Types
//!
//! This crate is the foundational library for the WASM light-client host,
//! containing the core data model, error taxonomy and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `ioi-lc-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. Shared identities such as
//! `Checksum`, `ClientId` and `Height` live here so that the code store, the
//! sandbox invoker and the governance gateway agree on a single canonical
//! representation.

/// The maximum size in bytes of an (uncompressed) light-client module.
pub const MAX_WASM_CODE_SIZE: usize = 3 * 1024 * 1024; // 3 MiB

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::CoreError> = std::result::Result<T, E>;

/// Host-level context values such as the block environment and governance authority.
pub mod app;
/// The canonical, deterministic binary codec for host-persisted records.
pub mod codec;
/// Configuration for the WASM light-client host.
pub mod config;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Core data structures for light-client identity: checksums, client ids and heights.
pub mod ibc;
/// Constants and builders for well-known state keys.
pub mod keys;
