// Path: crates/services/src/ibc/light_clients/wasm/msgs.rs

//! The JSON payload schema spoken across the sandbox boundary.
//!
//! A call's input is a [`CallEnvelope`]; its output is a [`CallResponse`]
//! wrapping one of the result shapes below. Byte fields travel as hex strings.
//! Result shapes reject unknown fields, so a module that answers in any other
//! shape is a schema mismatch rather than a silently truncated answer.

use ioi_lc_api::vm::EntryPoint;
use ioi_lc_types::app::BlockEnv;
use ioi_lc_types::ibc::{Checksum, Height, Status};
use serde::{Deserialize, Serialize};

/// Every message a light-client module must answer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallMsg {
    Instantiate {
        #[serde(with = "hex::serde")]
        client_state: Vec<u8>,
        #[serde(with = "hex::serde")]
        consensus_state: Vec<u8>,
        checksum: Checksum,
    },
    VerifyClientMessage {
        #[serde(with = "hex::serde")]
        client_message: Vec<u8>,
    },
    CheckForMisbehaviour {
        #[serde(with = "hex::serde")]
        client_message: Vec<u8>,
    },
    UpdateState {
        #[serde(with = "hex::serde")]
        client_message: Vec<u8>,
    },
    UpdateStateOnMisbehaviour {
        #[serde(with = "hex::serde")]
        client_message: Vec<u8>,
    },
    VerifyMembership {
        height: Height,
        delay_time_period: u64,
        delay_block_period: u64,
        #[serde(with = "hex::serde")]
        proof: Vec<u8>,
        #[serde(with = "hex::serde")]
        path: Vec<u8>,
        #[serde(with = "hex::serde")]
        value: Vec<u8>,
    },
    VerifyNonMembership {
        height: Height,
        delay_time_period: u64,
        delay_block_period: u64,
        #[serde(with = "hex::serde")]
        proof: Vec<u8>,
        #[serde(with = "hex::serde")]
        path: Vec<u8>,
    },
    Status {},
    ExportMetadata {},
    TimestampAtHeight {
        height: Height,
    },
    CheckSubstituteAndUpdateState {},
    VerifyUpgradeAndUpdateState {
        #[serde(with = "hex::serde")]
        upgrade_client_state: Vec<u8>,
        #[serde(with = "hex::serde")]
        upgrade_consensus_state: Vec<u8>,
        #[serde(with = "hex::serde")]
        proof_upgrade_client: Vec<u8>,
        #[serde(with = "hex::serde")]
        proof_upgrade_consensus_state: Vec<u8>,
    },
    MigrateClientStore {},
}

impl CallMsg {
    /// The entry point the message is delivered through.
    pub fn entry_point(&self) -> EntryPoint {
        match self {
            CallMsg::Instantiate { .. } => EntryPoint::Instantiate,
            CallMsg::Status {}
            | CallMsg::ExportMetadata {}
            | CallMsg::TimestampAtHeight { .. }
            | CallMsg::VerifyClientMessage { .. } => EntryPoint::Query,
            CallMsg::CheckForMisbehaviour { .. }
            | CallMsg::UpdateState { .. }
            | CallMsg::UpdateStateOnMisbehaviour { .. }
            | CallMsg::VerifyMembership { .. }
            | CallMsg::VerifyNonMembership { .. }
            | CallMsg::CheckSubstituteAndUpdateState {}
            | CallMsg::VerifyUpgradeAndUpdateState { .. }
            | CallMsg::MigrateClientStore {} => EntryPoint::Sudo,
        }
    }

    /// The snake-case tag of the message, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            CallMsg::Instantiate { .. } => "instantiate",
            CallMsg::VerifyClientMessage { .. } => "verify_client_message",
            CallMsg::CheckForMisbehaviour { .. } => "check_for_misbehaviour",
            CallMsg::UpdateState { .. } => "update_state",
            CallMsg::UpdateStateOnMisbehaviour { .. } => "update_state_on_misbehaviour",
            CallMsg::VerifyMembership { .. } => "verify_membership",
            CallMsg::VerifyNonMembership { .. } => "verify_non_membership",
            CallMsg::Status {} => "status",
            CallMsg::ExportMetadata {} => "export_metadata",
            CallMsg::TimestampAtHeight { .. } => "timestamp_at_height",
            CallMsg::CheckSubstituteAndUpdateState {} => "check_substitute_and_update_state",
            CallMsg::VerifyUpgradeAndUpdateState { .. } => "verify_upgrade_and_update_state",
            CallMsg::MigrateClientStore {} => "migrate_client_store",
        }
    }
}

/// The complete input of one module call.
#[derive(Serialize, Debug)]
pub struct CallEnvelope<'a> {
    pub env: &'a BlockEnv,
    pub msg: &'a CallMsg,
}

/// A module's answer: a result, or an explicit rejection.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallResponse<R> {
    Ok(R),
    Error(String),
}

/// The result of calls that only report success.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EmptyResult {}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StatusResult {
    pub status: Status,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CheckForMisbehaviourResult {
    pub found_misbehaviour: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpdateStateResult {
    pub heights: Vec<Height>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TimestampAtHeightResult {
    pub timestamp: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VerifyUpgradeResult {
    pub latest_height: Height,
}

/// One key/value pair of module metadata exported for genesis or upgrade tooling.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GenesisMetadata {
    #[serde(with = "hex::serde")]
    pub key: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExportMetadataResult {
    pub genesis_metadata: Vec<GenesisMetadata>,
}
