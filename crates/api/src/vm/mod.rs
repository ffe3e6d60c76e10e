// Path: crates/api/src/vm/mod.rs
//! Defines the core traits and types for virtual machines and the light-client module ABI.
//!
//! A light-client module is a core WASM module that exports:
//!
//! - `memory`: its linear memory,
//! - `allocate(len: u32) -> u32`: a buffer the host may write `len` bytes into,
//! - `instantiate`, `sudo`, `query`: `(ptr: u32, len: u32) -> u64`, each reading a
//!   JSON request from guest memory and returning `(result_ptr << 32) | result_len`,
//! - [`ABI_VERSION_EXPORT`]: an empty marker function pinning the payload schema.
//!
//! Modules may only import the host functions listed in [`HOST_IMPORTS`] from
//! the [`HOST_MODULE`] namespace.

use ioi_lc_types::error::VmError;
use ioi_lc_types::ibc::Checksum;
use crate::state::StateAccess;
use std::fmt;

/// The marker export that identifies the supported payload schema version.
pub const ABI_VERSION_EXPORT: &str = "light_client_abi_v1";
/// The export a module must provide for its linear memory.
pub const MEMORY_EXPORT: &str = "memory";
/// The export the host calls to obtain a guest buffer.
pub const ALLOCATE_EXPORT: &str = "allocate";
/// The import namespace of host functions.
pub const HOST_MODULE: &str = "env";
/// The host functions a module may import.
pub const HOST_IMPORTS: &[&str] = &["db_read", "db_write", "db_remove", "db_scan", "debug"];

/// One of the three module entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Creates the client's initial module-owned state.
    Instantiate,
    /// Every state-mutating operation.
    Sudo,
    /// Every read-only operation. Store writes trap.
    Query,
}

impl EntryPoint {
    /// All entry points, in export order.
    pub const ALL: [EntryPoint; 3] = [EntryPoint::Instantiate, EntryPoint::Sudo, EntryPoint::Query];

    /// The export name of the entry point.
    pub fn export_name(&self) -> &'static str {
        match self {
            EntryPoint::Instantiate => "instantiate",
            EntryPoint::Sudo => "sudo",
            EntryPoint::Query => "query",
        }
    }

    /// Returns true if the entry point must not mutate the store.
    pub fn is_read_only(&self) -> bool {
        matches!(self, EntryPoint::Query)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.export_name())
    }
}

/// A deterministic, gas-metered execution engine for light-client modules.
///
/// Implementations must not expose any source of nondeterminism (clock,
/// randomness, filesystem, network) to the module: every validator replays
/// the same call and must observe the same result or fault.
pub trait VirtualMachine: Send + Sync {
    /// Checks that `code` is a loadable module implementing the module ABI.
    fn validate(&self, code: &[u8]) -> Result<(), VmError>;

    /// Executes `entry_point` of the module with the given input.
    ///
    /// # Arguments
    /// * `checksum`: The identity of `code`, usable as a compilation cache key.
    /// * `code`: The uncompressed module bytes.
    /// * `entry_point`: Which export to call.
    /// * `input`: The serialized request.
    /// * `store`: The namespaced store handle the module operates on.
    /// * `context`: Execution limits.
    fn execute(
        &self,
        checksum: &Checksum,
        code: &[u8],
        entry_point: EntryPoint,
        input: &[u8],
        store: &mut dyn StateAccess,
        context: ExecutionContext,
    ) -> Result<ExecutionOutput, VmError>;
}

/// Contains the results of a successful module execution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// The amount of gas consumed by the execution.
    pub gas_used: u64,
    /// The data returned by the module.
    pub return_data: Vec<u8>,
}

/// Execution limits for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// The gas limit for the execution. A limit of zero always faults with `OutOfGas`.
    pub gas_limit: u64,
}

impl ExecutionContext {
    /// Creates a context with the given gas limit.
    pub fn with_gas_limit(gas_limit: u64) -> Self {
        Self { gas_limit }
    }
}
