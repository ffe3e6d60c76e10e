// Path: crates/services/src/ibc/light_clients/wasm/client_state.rs

//! The host-visible client state and the uniform light-client contract.
//!
//! [`WasmClient`] forwards every light-client operation to the module pinned by
//! the client's checksum and reinterprets module rejections into the
//! light-client error taxonomy. Host-owned records (`host/checksum`,
//! `host/latestHeight`, `host/checksumHistory`) are SCALE-encoded inside the
//! client namespace; everything else there belongs to the module.

use super::consensus_state::WasmConsensusState;
use super::invoker::{SandboxInvoker, StoreScope};
use super::msgs::{
    CallMsg, CheckForMisbehaviourResult, EmptyResult, ExportMetadataResult, GenesisMetadata,
    StatusResult, TimestampAtHeightResult, UpdateStateResult, VerifyUpgradeResult,
};
use super::atomically;
use ioi_lc_api::state::{ClientStore, StateAccess};
use ioi_lc_types::app::BlockEnv;
use ioi_lc_types::codec;
use ioi_lc_types::error::{ClientError, InvokeError};
use ioi_lc_types::ibc::{Checksum, ClientId, Height, Status};
use ioi_lc_types::keys::{
    CLIENT_CHECKSUM_HISTORY_KEY, CLIENT_CHECKSUM_KEY, CLIENT_LATEST_HEIGHT_KEY, CLIENT_STATE_KEY,
};

/// A light-client instance as the host sees it: an opaque module-owned blob,
/// the checksum of the module that interprets it, and the latest height the
/// host has recorded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmClientState {
    pub data: Vec<u8>,
    pub checksum: Checksum,
    pub latest_height: Height,
}

impl WasmClientState {
    pub fn new(data: impl Into<Vec<u8>>, checksum: Checksum, latest_height: Height) -> Self {
        Self {
            data: data.into(),
            checksum,
            latest_height,
        }
    }

    /// Loads the client state of `client_id`. Fails `ClientNotFound` if the
    /// client was never initialized.
    pub fn load(state: &dyn StateAccess, client_id: &ClientId) -> Result<Self, ClientError> {
        let checksum = load_checksum(state, client_id)?
            .ok_or_else(|| ClientError::ClientNotFound(client_id.clone()))?;
        let store = ClientStore::read_only(state, client_id);
        let latest_height = match store.get(CLIENT_LATEST_HEIGHT_KEY)? {
            Some(raw) => codec::from_bytes_canonical(&raw)?,
            None => Height::default(),
        };
        let data = store.get(CLIENT_STATE_KEY)?.unwrap_or_default();
        Ok(Self {
            data,
            checksum,
            latest_height,
        })
    }
}

pub(crate) fn load_checksum(
    state: &dyn StateAccess,
    client_id: &ClientId,
) -> Result<Option<Checksum>, ClientError> {
    let store = ClientStore::read_only(state, client_id);
    match store.get(CLIENT_CHECKSUM_KEY)? {
        Some(raw) => Ok(Some(codec::from_bytes_canonical(&raw)?)),
        None => Ok(None),
    }
}

/// Every checksum the client has run, oldest first, including the current one.
pub fn load_checksum_history(
    state: &dyn StateAccess,
    client_id: &ClientId,
) -> Result<Vec<Checksum>, ClientError> {
    let store = ClientStore::read_only(state, client_id);
    match store.get(CLIENT_CHECKSUM_HISTORY_KEY)? {
        Some(raw) => Ok(codec::from_bytes_canonical(&raw)?),
        None => Ok(Vec::new()),
    }
}

/// Points the client at `checksum` and appends it to the checksum history.
pub(crate) fn store_checksum(
    state: &mut dyn StateAccess,
    client_id: &ClientId,
    checksum: &Checksum,
) -> Result<(), ClientError> {
    let mut history = load_checksum_history(&*state, client_id)?;
    if !history.contains(checksum) {
        history.push(*checksum);
    }
    let mut store = ClientStore::host(state, client_id);
    store.insert(CLIENT_CHECKSUM_KEY, &codec::to_bytes_canonical(checksum))?;
    store.insert(CLIENT_CHECKSUM_HISTORY_KEY, &codec::to_bytes_canonical(&history))?;
    Ok(())
}

pub(crate) fn store_latest_height(
    state: &mut dyn StateAccess,
    client_id: &ClientId,
    height: &Height,
) -> Result<(), ClientError> {
    ClientStore::host(state, client_id)
        .insert(CLIENT_LATEST_HEIGHT_KEY, &codec::to_bytes_canonical(height))?;
    Ok(())
}

pub(crate) fn store_client_data(
    state: &mut dyn StateAccess,
    client_id: &ClientId,
    data: &[u8],
) -> Result<(), ClientError> {
    ClientStore::host(state, client_id).insert(CLIENT_STATE_KEY, data)?;
    Ok(())
}

/// A client message the module has accepted.
///
/// Only [`WasmClient::verify_client_message`] creates one, so state-mutating
/// updates cannot be reached with an unverified message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClientMessage {
    client_id: ClientId,
    bytes: Vec<u8>,
}

impl VerifiedClientMessage {
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The proof arguments shared by membership and non-membership checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRequest {
    pub height: Height,
    pub delay_time_period: u64,
    pub delay_block_period: u64,
    pub proof: Vec<u8>,
    pub path: Vec<u8>,
}

/// The arguments of an upgrade to a new client and consensus state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub upgrade_client_state: Vec<u8>,
    pub upgrade_consensus_state: Vec<u8>,
    pub proof_upgrade_client: Vec<u8>,
    pub proof_upgrade_consensus_state: Vec<u8>,
}

fn rejected_as(kind: fn(String) -> ClientError) -> impl Fn(InvokeError) -> ClientError {
    move |e| match e {
        InvokeError::Rejected(reason) => kind(reason),
        other => ClientError::Invoke(other),
    }
}

/// A handle on one initialized client, bound to the block environment of the
/// current transaction.
pub struct WasmClient<'m> {
    invoker: &'m SandboxInvoker,
    client_id: ClientId,
    checksum: Checksum,
    env: BlockEnv,
}

impl<'m> WasmClient<'m> {
    pub(crate) fn new(invoker: &'m SandboxInvoker, client_id: ClientId, checksum: Checksum, env: BlockEnv) -> Self {
        Self {
            invoker,
            client_id,
            checksum,
            env,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn client_state(&self, state: &dyn StateAccess) -> Result<WasmClientState, ClientError> {
        WasmClientState::load(state, &self.client_id)
    }

    pub fn consensus_state(
        &self,
        state: &dyn StateAccess,
        height: &Height,
    ) -> Result<WasmConsensusState, ClientError> {
        WasmConsensusState::load(state, &self.client_id, height)
    }

    fn query<R: serde::de::DeserializeOwned>(
        &self,
        state: &dyn StateAccess,
        msg: &CallMsg,
    ) -> Result<R, InvokeError> {
        self.invoker
            .query(state, &self.client_id, &self.checksum, msg, &self.env)
    }

    fn sudo<R: serde::de::DeserializeOwned>(
        &self,
        state: &mut dyn StateAccess,
        msg: &CallMsg,
    ) -> Result<R, InvokeError> {
        self.invoker.call(
            state,
            StoreScope::Client(&self.client_id),
            &self.checksum,
            msg,
            &self.env,
        )
    }

    fn ensure_verified(&self, msg: &VerifiedClientMessage) -> Result<(), ClientError> {
        if msg.client_id != self.client_id {
            return Err(ClientError::InvalidClientMessage(format!(
                "message was verified for client {}",
                msg.client_id
            )));
        }
        Ok(())
    }

    /// Asks the module for the client's status. Never mutates state.
    ///
    /// A module that declines to answer yields `Unknown`; faults are returned.
    pub fn status(&self, state: &dyn StateAccess) -> Result<Status, ClientError> {
        match self.query::<StatusResult>(state, &CallMsg::Status {}) {
            Ok(result) => Ok(result.status),
            Err(InvokeError::Rejected(_)) => Ok(Status::Unknown),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_status(&self, state: &dyn StateAccess, allowed: &[Status]) -> Result<Status, ClientError> {
        let status = self.status(state)?;
        if !allowed.contains(&status) {
            return Err(ClientError::UnexpectedStatus {
                client_id: self.client_id.clone(),
                status,
            });
        }
        Ok(status)
    }

    pub fn export_metadata(&self, state: &dyn StateAccess) -> Result<Vec<GenesisMetadata>, ClientError> {
        self.query::<ExportMetadataResult>(state, &CallMsg::ExportMetadata {})
            .map(|r| r.genesis_metadata)
            .map_err(rejected_as(ClientError::Rejected))
    }

    pub fn timestamp_at_height(&self, state: &dyn StateAccess, height: &Height) -> Result<u64, ClientError> {
        self.consensus_state(state, height)?;
        self.query::<TimestampAtHeightResult>(state, &CallMsg::TimestampAtHeight { height: *height })
            .map(|r| r.timestamp)
            .map_err(rejected_as(ClientError::Rejected))
    }

    /// Verifies a header or misbehaviour submission. Must succeed before any update.
    pub fn verify_client_message(
        &self,
        state: &dyn StateAccess,
        client_message: &[u8],
    ) -> Result<VerifiedClientMessage, ClientError> {
        let msg = CallMsg::VerifyClientMessage {
            client_message: client_message.to_vec(),
        };
        self.query::<EmptyResult>(state, &msg)
            .map_err(rejected_as(ClientError::InvalidClientMessage))?;
        Ok(VerifiedClientMessage {
            client_id: self.client_id.clone(),
            bytes: client_message.to_vec(),
        })
    }

    /// Returns true if the verified message is evidence of misbehaviour.
    pub fn check_for_misbehaviour(
        &self,
        state: &mut dyn StateAccess,
        client_message: &VerifiedClientMessage,
    ) -> Result<bool, ClientError> {
        self.ensure_verified(client_message)?;
        let msg = CallMsg::CheckForMisbehaviour {
            client_message: client_message.bytes.clone(),
        };
        self.sudo::<CheckForMisbehaviourResult>(state, &msg)
            .map(|r| r.found_misbehaviour)
            .map_err(rejected_as(ClientError::InvalidClientMessage))
    }

    /// Applies a verified header, returning the heights the module updated.
    /// The recorded latest height advances to the greatest of them.
    pub fn update_state(
        &self,
        state: &mut dyn StateAccess,
        client_message: VerifiedClientMessage,
    ) -> Result<Vec<Height>, ClientError> {
        self.ensure_verified(&client_message)?;
        let msg = CallMsg::UpdateState {
            client_message: client_message.bytes,
        };
        atomically(state, |overlay| {
            let result = self
                .sudo::<UpdateStateResult>(overlay, &msg)
                .map_err(rejected_as(ClientError::InvalidClientMessage))?;
            let current = WasmClientState::load(&*overlay, &self.client_id)?.latest_height;
            if let Some(highest) = result.heights.iter().max().filter(|h| **h > current) {
                store_latest_height(overlay, &self.client_id, highest)?;
            }
            tracing::debug!(
                target: "ibc_wasm",
                client_id = %self.client_id,
                heights = ?result.heights,
                "updated client state"
            );
            Ok(result.heights)
        })
    }

    /// Freezes the client after verified misbehaviour.
    pub fn update_state_on_misbehaviour(
        &self,
        state: &mut dyn StateAccess,
        client_message: VerifiedClientMessage,
    ) -> Result<(), ClientError> {
        self.ensure_verified(&client_message)?;
        let msg = CallMsg::UpdateStateOnMisbehaviour {
            client_message: client_message.bytes,
        };
        self.sudo::<EmptyResult>(state, &msg)
            .map_err(rejected_as(ClientError::InvalidClientMessage))?;
        tracing::warn!(target: "ibc_wasm", client_id = %self.client_id, "client frozen on misbehaviour");
        Ok(())
    }

    /// Verifies that `value` is committed at `request.path` in the consensus state at `request.height`.
    pub fn verify_membership(
        &self,
        state: &mut dyn StateAccess,
        request: &ProofRequest,
        value: &[u8],
    ) -> Result<(), ClientError> {
        self.consensus_state(&*state, &request.height)?;
        let msg = CallMsg::VerifyMembership {
            height: request.height,
            delay_time_period: request.delay_time_period,
            delay_block_period: request.delay_block_period,
            proof: request.proof.clone(),
            path: request.path.clone(),
            value: value.to_vec(),
        };
        self.sudo::<EmptyResult>(state, &msg)
            .map(|_| ())
            .map_err(rejected_as(ClientError::InvalidProof))
    }

    /// Verifies that nothing is committed at `request.path` in the consensus state at `request.height`.
    pub fn verify_non_membership(
        &self,
        state: &mut dyn StateAccess,
        request: &ProofRequest,
    ) -> Result<(), ClientError> {
        self.consensus_state(&*state, &request.height)?;
        let msg = CallMsg::VerifyNonMembership {
            height: request.height,
            delay_time_period: request.delay_time_period,
            delay_block_period: request.delay_block_period,
            proof: request.proof.clone(),
            path: request.path.clone(),
        };
        self.sudo::<EmptyResult>(state, &msg)
            .map(|_| ())
            .map_err(rejected_as(ClientError::InvalidProof))
    }

    /// Realigns this client to the state of `substitute`.
    ///
    /// Both clients must run the same checksum. The module sees the subject
    /// namespace under `subject/` and the substitute namespace, read-only, under
    /// `substitute/`. On success the recorded latest height is copied from the
    /// substitute.
    pub fn check_substitute_and_update_state(
        &self,
        state: &mut dyn StateAccess,
        substitute: &ClientId,
    ) -> Result<(), ClientError> {
        if *substitute == self.client_id {
            return Err(ClientError::InvalidClientState(
                "a client cannot substitute itself".into(),
            ));
        }
        let substitute_state = WasmClientState::load(&*state, substitute)?;
        if substitute_state.checksum != self.checksum {
            return Err(ClientError::ChecksumMismatch {
                subject: self.checksum,
                substitute: substitute_state.checksum,
            });
        }
        atomically(state, |overlay| {
            self.invoker
                .call::<EmptyResult>(
                    overlay,
                    StoreScope::Recovery {
                        subject: &self.client_id,
                        substitute,
                    },
                    &self.checksum,
                    &CallMsg::CheckSubstituteAndUpdateState {},
                    &self.env,
                )
                .map_err(rejected_as(ClientError::Rejected))?;
            store_latest_height(overlay, &self.client_id, &substitute_state.latest_height)
        })?;
        tracing::info!(
            target: "ibc_wasm",
            client_id = %self.client_id,
            %substitute,
            "client recovered from substitute"
        );
        Ok(())
    }

    /// Verifies upgrade proofs against the latest consensus state and moves
    /// the client to the upgraded states. Requires an active client.
    pub fn verify_upgrade_and_update_state(
        &self,
        state: &mut dyn StateAccess,
        request: UpgradeRequest,
    ) -> Result<Height, ClientError> {
        self.ensure_status(&*state, &[Status::Active])?;
        let msg = CallMsg::VerifyUpgradeAndUpdateState {
            upgrade_client_state: request.upgrade_client_state,
            upgrade_consensus_state: request.upgrade_consensus_state,
            proof_upgrade_client: request.proof_upgrade_client,
            proof_upgrade_consensus_state: request.proof_upgrade_consensus_state,
        };
        atomically(state, |overlay| {
            let result = self
                .sudo::<VerifyUpgradeResult>(overlay, &msg)
                .map_err(rejected_as(ClientError::InvalidProof))?;
            store_latest_height(overlay, &self.client_id, &result.latest_height)?;
            Ok(result.latest_height)
        })
    }

    /// Fails `UnexpectedStatus` unless the client's status is one of `allowed`.
    pub fn require_status(&self, state: &dyn StateAccess, allowed: &[Status]) -> Result<Status, ClientError> {
        self.ensure_status(state, allowed)
    }
}
