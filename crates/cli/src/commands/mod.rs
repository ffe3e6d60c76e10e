// Path: crates/cli/src/commands/mod.rs

pub mod client;
pub mod code;
pub mod config;
