// Path: crates/types/src/error/mod.rs
//! Core error types for the WASM light-client host.
//!
//! The taxonomy follows the call path: `StateError` for the key-value backend,
//! `VmError` for the execution engine, `CodeError` for the content-addressed
//! code store, `InvokeError` for the sandbox call boundary, `ClientError` for the
//! uniform light-client contract and `GovernanceError`/`UpgradeError` for the
//! gated operations. `CoreError` is the umbrella used at the crate edges.

use crate::ibc::{Checksum, ClientId, Height, Status};
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors related to the key-value state backend.
#[derive(Error, Debug)]
pub enum StateError {
    /// The requested key was not found in the state.
    #[error("Key not found in state")]
    KeyNotFound,
    /// An error occurred in the state backend.
    #[error("State backend error: {0}")]
    Backend(String),
    /// An error occurred while writing to the state.
    #[error("State write error: {0}")]
    WriteError(String),
    /// The provided value was invalid.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// An error occurred during state deserialization.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The operation was denied due to insufficient permissions on a state key.
    #[error("Permission denied for state key: {0}")]
    PermissionDenied(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "STATE_KEY_NOT_FOUND",
            Self::Backend(_) => "STATE_BACKEND_ERROR",
            Self::WriteError(_) => "STATE_WRITE_ERROR",
            Self::InvalidValue(_) => "STATE_INVALID_VALUE",
            Self::Decode(_) => "STATE_DECODE_ERROR",
            Self::PermissionDenied(_) => "STATE_PERMISSION_DENIED",
        }
    }
}

/// Errors related to the virtual machine that executes light-client modules.
#[derive(Error, Debug)]
pub enum VmError {
    /// The VM failed to initialize.
    #[error("VM initialization failed: {0}")]
    Initialization(String),
    /// The provided module bytecode was invalid or does not implement the module ABI.
    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),
    /// Execution exhausted its gas (fuel) budget.
    #[error("Execution ran out of gas")]
    OutOfGas,
    /// The module execution trapped (e.g., unreachable, memory access error, panic).
    #[error("Execution trapped: {0}")]
    ExecutionTrap(String),
    /// The requested entry point was not found in the module.
    #[error("Function not found in module: {0}")]
    FunctionNotFound(String),
    /// An error occurred within a host function called by the module.
    #[error("Host function error: {0}")]
    HostError(String),
    /// A memory allocation or access error occurred within the VM.
    #[error("Memory allocation/access error in VM: {0}")]
    MemoryError(String),
}

impl ErrorCode for VmError {
    fn code(&self) -> &'static str {
        match self {
            Self::Initialization(_) => "VM_INITIALIZATION_FAILED",
            Self::InvalidBytecode(_) => "VM_INVALID_BYTECODE",
            Self::OutOfGas => "VM_OUT_OF_GAS",
            Self::ExecutionTrap(_) => "VM_EXECUTION_TRAP",
            Self::FunctionNotFound(_) => "VM_FUNCTION_NOT_FOUND",
            Self::HostError(_) => "VM_HOST_ERROR",
            Self::MemoryError(_) => "VM_MEMORY_ERROR",
        }
    }
}

/// Errors related to the content-addressed code store.
#[derive(Error, Debug)]
pub enum CodeError {
    /// The uploaded module was empty.
    #[error("Module bytes are empty")]
    Empty,
    /// The (uncompressed) module exceeds the configured maximum size.
    #[error("Module size {size} exceeds maximum of {max} bytes")]
    TooLarge {
        /// The size of the rejected module in bytes.
        size: usize,
        /// The configured maximum in bytes.
        max: usize,
    },
    /// A compressed upload could not be decompressed.
    #[error("Failed to decompress module: {0}")]
    Decompress(String),
    /// The module failed validation against the module ABI.
    #[error("Invalid module: {0}")]
    InvalidModule(String),
    /// No module is stored under the checksum.
    #[error("No module stored for checksum {0}")]
    NotFound(Checksum),
    /// The stored bytes no longer hash to their checksum.
    #[error("Stored module does not match checksum {0}")]
    Corrupted(Checksum),
    /// An error occurred while accessing the state.
    #[error("State access error: {0}")]
    State(#[from] StateError),
}

impl ErrorCode for CodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Empty => "CODE_EMPTY",
            Self::TooLarge { .. } => "CODE_TOO_LARGE",
            Self::Decompress(_) => "CODE_DECOMPRESS_FAILED",
            Self::InvalidModule(_) => "CODE_INVALID_MODULE",
            Self::NotFound(_) => "CODE_NOT_FOUND",
            Self::Corrupted(_) => "CODE_CORRUPTED",
            Self::State(_) => "CODE_STATE_ERROR",
        }
    }
}

/// Outcomes of a sandbox call other than a successfully decoded result.
///
/// `Rejected` is the module refusing the request and is an ordinary outcome.
/// Every other variant is a fault: the call made no state changes and must not
/// be retried with the same inputs.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// The checksum has no stored module.
    #[error("Module not found for checksum {0}")]
    ModuleNotFound(Checksum),
    /// The module exhausted its gas limit.
    #[error("Module ran out of gas")]
    OutOfGas,
    /// The module trapped or signaled an unrecoverable condition.
    #[error("Module trapped: {0}")]
    ModuleTrap(String),
    /// The module returned a payload that does not decode into the expected result shape.
    #[error("Module {checksum} result schema mismatch: {reason}")]
    SchemaMismatch {
        /// The module that answered outside the schema.
        checksum: Checksum,
        /// Why the answer did not decode.
        reason: String,
    },
    /// Calls to the checksum are halted after a schema mismatch.
    #[error("Module {0} is quarantined after a contract violation")]
    Quarantined(Checksum),
    /// The module answered with an explicit error.
    #[error("Module rejected the request: {0}")]
    Rejected(String),
    /// The host failed while running the call (engine or backend failure).
    #[error("Host failure during module call: {0}")]
    Host(String),
    /// An error occurred while reading or committing state.
    #[error("State access error: {0}")]
    State(#[from] StateError),
}

impl InvokeError {
    /// Returns true for faults, i.e. every outcome except a module rejection.
    pub fn is_fault(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

impl ErrorCode for InvokeError {
    fn code(&self) -> &'static str {
        match self {
            Self::ModuleNotFound(_) => "INVOKE_MODULE_NOT_FOUND",
            Self::OutOfGas => "INVOKE_OUT_OF_GAS",
            Self::ModuleTrap(_) => "INVOKE_MODULE_TRAP",
            Self::SchemaMismatch { .. } => "INVOKE_SCHEMA_MISMATCH",
            Self::Quarantined(_) => "INVOKE_QUARANTINED",
            Self::Rejected(_) => "INVOKE_REJECTED",
            Self::Host(_) => "INVOKE_HOST_FAILURE",
            Self::State(_) => "INVOKE_STATE_ERROR",
        }
    }
}

impl From<VmError> for InvokeError {
    fn from(e: VmError) -> Self {
        match e {
            VmError::OutOfGas => InvokeError::OutOfGas,
            VmError::ExecutionTrap(msg)
            | VmError::FunctionNotFound(msg)
            | VmError::MemoryError(msg)
            | VmError::InvalidBytecode(msg) => InvokeError::ModuleTrap(msg),
            VmError::Initialization(msg) | VmError::HostError(msg) => InvokeError::Host(msg),
        }
    }
}

/// Errors surfaced by the uniform light-client contract.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The client identifier is malformed.
    #[error("Invalid client identifier: {0}")]
    InvalidClientId(String),
    /// No client exists under the identifier.
    #[error("Client {0} not found")]
    ClientNotFound(ClientId),
    /// A client already exists under the identifier.
    #[error("Client {0} already exists")]
    ClientAlreadyExists(ClientId),
    /// No consensus state is tracked at the requested height.
    #[error("Consensus state for client {client_id} not found at height {height}")]
    ConsensusStateNotFound {
        /// The client that was queried.
        client_id: ClientId,
        /// The height that has no consensus state.
        height: Height,
    },
    /// The referenced checksum was never stored.
    #[error("Checksum {0} not found in the code store")]
    ChecksumNotFound(Checksum),
    /// Substitute recovery across different modules was attempted.
    #[error("Subject checksum {subject} does not match substitute checksum {substitute}")]
    ChecksumMismatch {
        /// The checksum of the client being recovered.
        subject: Checksum,
        /// The checksum of the substitute client.
        substitute: Checksum,
    },
    /// The client state supplied by the caller is invalid.
    #[error("Invalid client state: {0}")]
    InvalidClientState(String),
    /// The consensus state supplied by the caller is invalid.
    #[error("Invalid consensus state: {0}")]
    InvalidConsensusState(String),
    /// The client is not in the status the operation requires.
    #[error("Client {client_id} has status {status}")]
    UnexpectedStatus {
        /// The client that was checked.
        client_id: ClientId,
        /// The status it actually has.
        status: Status,
    },
    /// The module reported that a membership or non-membership proof does not verify.
    #[error("Invalid proof: {0}")]
    InvalidProof(String),
    /// The module rejected a header or misbehaviour submission.
    #[error("Invalid client message: {0}")]
    InvalidClientMessage(String),
    /// The module rejected a state-machine operation.
    #[error("Light client rejected the operation: {0}")]
    Rejected(String),
    /// The sandbox call faulted.
    #[error("Sandbox fault: {0}")]
    Invoke(#[from] InvokeError),
    /// An error occurred while accessing host-owned client records.
    #[error("State access error: {0}")]
    State(#[from] StateError),
}

impl ClientError {
    /// Returns true for sandbox faults and backend failures, which abort the
    /// enclosing transaction and are logged for operator diagnosis.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Invoke(e) => e.is_fault(),
            Self::State(_) => true,
            _ => false,
        }
    }

    /// Returns true if the error reports a missing client, consensus state or checksum.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ClientNotFound(_)
                | Self::ConsensusStateNotFound { .. }
                | Self::ChecksumNotFound(_)
                | Self::Invoke(InvokeError::ModuleNotFound(_))
        )
    }
}

impl ErrorCode for ClientError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidClientId(_) => "CLIENT_INVALID_ID",
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::ClientAlreadyExists(_) => "CLIENT_ALREADY_EXISTS",
            Self::ConsensusStateNotFound { .. } => "CLIENT_CONSENSUS_STATE_NOT_FOUND",
            Self::ChecksumNotFound(_) => "CLIENT_CHECKSUM_NOT_FOUND",
            Self::ChecksumMismatch { .. } => "CLIENT_CHECKSUM_MISMATCH",
            Self::InvalidClientState(_) => "CLIENT_INVALID_CLIENT_STATE",
            Self::InvalidConsensusState(_) => "CLIENT_INVALID_CONSENSUS_STATE",
            Self::UnexpectedStatus { .. } => "CLIENT_UNEXPECTED_STATUS",
            Self::InvalidProof(_) => "CLIENT_INVALID_PROOF",
            Self::InvalidClientMessage(_) => "CLIENT_INVALID_CLIENT_MESSAGE",
            Self::Rejected(_) => "CLIENT_REJECTED",
            Self::Invoke(e) => e.code(),
            Self::State(_) => "CLIENT_STATE_ERROR",
        }
    }
}

/// Errors related to governance-gated operations.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The caller does not hold the designated governance authority.
    #[error("Unauthorized: {0} is not the governance authority")]
    Unauthorized(String),
    /// A general validation error occurred.
    #[error("Invalid governance operation: {0}")]
    Invalid(String),
}

impl ErrorCode for GovernanceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "GOVERNANCE_UNAUTHORIZED",
            Self::Invalid(_) => "GOVERNANCE_INVALID_OPERATION",
        }
    }
}

/// Errors related to migrating a client to a new module checksum.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// The client already runs the target checksum.
    #[error("Client already runs checksum {0}")]
    SameChecksum(Checksum),
    /// The target checksum was run by the client before and reuse is disabled.
    #[error("Migration back to previously used checksum {0} is not permitted")]
    DowngradeForbidden(Checksum),
    /// The module failed to migrate the client store.
    #[error("State migration failed: {0}")]
    MigrationFailed(String),
}

impl ErrorCode for UpgradeError {
    fn code(&self) -> &'static str {
        match self {
            Self::SameChecksum(_) => "UPGRADE_SAME_CHECKSUM",
            Self::DowngradeForbidden(_) => "UPGRADE_DOWNGRADE_FORBIDDEN",
            Self::MigrationFailed(_) => "UPGRADE_MIGRATION_FAILED",
        }
    }
}

/// General errors surfaced at the crate edges.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A governance check failed.
    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),
    /// A code-store operation failed.
    #[error("Code store error: {0}")]
    Code(#[from] CodeError),
    /// A light-client operation failed.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    /// A client migration failed.
    #[error("Upgrade error: {0}")]
    Upgrade(#[from] UpgradeError),
    /// A state backend operation failed.
    #[error("State error: {0}")]
    State(#[from] StateError),
    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A custom, unspecified error.
    #[error("Custom error: {0}")]
    Custom(String),
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Governance(e) => e.code(),
            Self::Code(e) => e.code(),
            Self::Client(e) => e.code(),
            Self::Upgrade(e) => e.code(),
            Self::State(e) => e.code(),
            Self::Config(_) => "CORE_CONFIG_ERROR",
            Self::Custom(_) => "CORE_CUSTOM_ERROR",
        }
    }
}

impl From<InvokeError> for CoreError {
    fn from(e: InvokeError) -> Self {
        CoreError::Client(ClientError::Invoke(e))
    }
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Custom(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_errors_classify_into_invoke_faults() {
        assert!(matches!(InvokeError::from(VmError::OutOfGas), InvokeError::OutOfGas));
        assert!(matches!(
            InvokeError::from(VmError::ExecutionTrap("unreachable".into())),
            InvokeError::ModuleTrap(_)
        ));
        assert!(matches!(
            InvokeError::from(VmError::HostError("backend".into())),
            InvokeError::Host(_)
        ));
    }

    #[test]
    fn rejection_is_not_fatal() {
        let rejected = ClientError::Invoke(InvokeError::Rejected("bad header".into()));
        assert!(!rejected.is_fatal());
        assert!(ClientError::Invoke(InvokeError::OutOfGas).is_fatal());
        assert!(!ClientError::InvalidProof("mismatch".into()).is_fatal());
    }

    #[test]
    fn codes_pass_through_umbrella() {
        let err = CoreError::from(InvokeError::SchemaMismatch {
            checksum: Checksum::new([1; 32]),
            reason: "missing field".into(),
        });
        assert_eq!(err.code(), "INVOKE_SCHEMA_MISMATCH");
        let err = CoreError::from(GovernanceError::Unauthorized("mallory".into()));
        assert_eq!(err.code(), "GOVERNANCE_UNAUTHORIZED");
    }
}
