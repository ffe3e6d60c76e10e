// Path: crates/services/src/ibc/light_clients/mod.rs

//! Light clients whose verification logic runs as checksum-identified WASM modules.

pub mod wasm;
