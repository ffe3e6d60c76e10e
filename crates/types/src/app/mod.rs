// Path: crates/types/src/app/mod.rs
//! Host-level context values passed into every light-client call.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The deterministic block environment of the executing host transaction.
///
/// This is the only notion of "now" a light-client module ever sees. It is taken
/// from the block header being executed, never from a wall clock, so every
/// validator replaying the block observes identical values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct BlockEnv {
    /// Height of the host block executing the call.
    pub block_height: u64,
    /// Timestamp of the host block in unix nanoseconds.
    pub block_time: u64,
}

impl BlockEnv {
    /// Creates a new block environment.
    pub const fn new(block_height: u64, block_time: u64) -> Self {
        Self {
            block_height,
            block_time,
        }
    }
}

/// An opaque governance credential, e.g. the address of the governance module account.
///
/// How the credential is obtained (voting, multisig) is outside this crate; the
/// gateway only compares it for equality with its configured authority.
#[derive(Clone, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
    /// Wraps an authority string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the authority as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Authority({})", self.0)
    }
}
