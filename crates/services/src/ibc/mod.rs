// Path: crates/services/src/ibc/mod.rs

//! IBC light-client services.

/// Light client implementations backed by sandboxed modules.
pub mod light_clients;
