// Path: crates/services/src/governance/mod.rs
//! Governance-gated operations on the WASM light-client host.
//!
//! Uploading modules, moving a client to a new module, recovering a client
//! from a substitute and pruning modules all require the designated
//! [`Authority`]. How that credential is obtained is outside this crate; the
//! gateway only compares it with the one it was configured with.

use crate::ibc::light_clients::wasm::client_state::{self, load_checksum_history};
use crate::ibc::light_clients::wasm::msgs::{CallMsg, EmptyResult};
use crate::ibc::light_clients::wasm::{atomically, StoreScope, WasmLightClientModule};
use ioi_lc_api::state::StateAccess;
use ioi_lc_types::app::{Authority, BlockEnv};
use ioi_lc_types::config::WasmConfig;
use ioi_lc_types::error::{ClientError, CoreError, GovernanceError, InvokeError, UpgradeError};
use ioi_lc_types::ibc::{Checksum, ClientId, Status};
use std::sync::Arc;

/// The authorization and checksum-pinning gate in front of the code store.
pub struct WasmGovernanceGateway {
    module: Arc<WasmLightClientModule>,
    authority: Authority,
    allow_checksum_reuse: bool,
}

impl WasmGovernanceGateway {
    pub fn new(module: Arc<WasmLightClientModule>, config: &WasmConfig) -> Self {
        Self {
            module,
            authority: Authority::new(config.authority.clone()),
            allow_checksum_reuse: config.allow_checksum_reuse,
        }
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn module(&self) -> &WasmLightClientModule {
        &self.module
    }

    fn authorize(&self, caller: &Authority, action: &str) -> Result<(), GovernanceError> {
        if *caller != self.authority {
            tracing::warn!(target: "governance", %caller, action, "unauthorized governance call");
            return Err(GovernanceError::Unauthorized(caller.to_string()));
        }
        Ok(())
    }

    /// Uploads a module. Re-uploading identical bytes returns the same checksum.
    pub fn store_code(
        &self,
        state: &mut dyn StateAccess,
        code: &[u8],
        caller: &Authority,
    ) -> Result<Checksum, CoreError> {
        self.authorize(caller, "store_code")?;
        let checksum = self.module.code_store().put(state, code)?;
        tracing::info!(target: "governance", %checksum, "module upload accepted");
        Ok(checksum)
    }

    /// Moves a client to `new_checksum`.
    ///
    /// The new module migrates the existing client store through
    /// `migrate_client_store`, then the checksum pointer is repointed. Both
    /// happen in one overlay, so a failed migration leaves the client on its
    /// old checksum with its old store.
    pub fn migrate_client_store(
        &self,
        state: &mut dyn StateAccess,
        env: BlockEnv,
        client_id: &ClientId,
        new_checksum: &Checksum,
        caller: &Authority,
    ) -> Result<(), CoreError> {
        self.authorize(caller, "migrate_client_store")?;
        let client = self.module.client(&*state, client_id, env)?;
        if !self.module.code_store().has(&*state, new_checksum)? {
            return Err(ClientError::ChecksumNotFound(*new_checksum).into());
        }
        if client.checksum() == new_checksum {
            return Err(UpgradeError::SameChecksum(*new_checksum).into());
        }
        let history = load_checksum_history(&*state, client_id)?;
        if !self.allow_checksum_reuse && history.contains(new_checksum) {
            return Err(UpgradeError::DowngradeForbidden(*new_checksum).into());
        }

        atomically(state, |overlay| {
            self.module
                .invoker()
                .call::<EmptyResult>(
                    overlay,
                    StoreScope::Client(client_id),
                    new_checksum,
                    &CallMsg::MigrateClientStore {},
                    &env,
                )
                .map_err(|e| match e {
                    InvokeError::Rejected(reason) => CoreError::Upgrade(UpgradeError::MigrationFailed(reason)),
                    other => CoreError::Client(ClientError::Invoke(other)),
                })?;
            client_state::store_checksum(overlay, client_id, new_checksum)?;
            Ok::<(), CoreError>(())
        })?;

        tracing::info!(
            target: "governance",
            %client_id,
            from = %client.checksum(),
            to = %new_checksum,
            "migrated client store"
        );
        Ok(())
    }

    /// Recovers a frozen or expired client from an active substitute running
    /// the same checksum.
    pub fn recover_client(
        &self,
        state: &mut dyn StateAccess,
        env: BlockEnv,
        subject: &ClientId,
        substitute: &ClientId,
        caller: &Authority,
    ) -> Result<(), CoreError> {
        self.authorize(caller, "recover_client")?;
        let subject_client = self.module.client(&*state, subject, env)?;
        subject_client.require_status(&*state, &[Status::Frozen, Status::Expired])?;
        self.module
            .client(&*state, substitute, env)?
            .require_status(&*state, &[Status::Active])?;
        subject_client.check_substitute_and_update_state(state, substitute)?;
        Ok(())
    }

    /// Prunes a module no client runs anymore.
    pub fn remove_checksum(
        &self,
        state: &mut dyn StateAccess,
        checksum: &Checksum,
        caller: &Authority,
    ) -> Result<(), CoreError> {
        self.authorize(caller, "remove_checksum")?;
        if let Some((client_id, _)) = self
            .module
            .clients(&*state)?
            .into_iter()
            .find(|(_, c)| c == checksum)
        {
            return Err(GovernanceError::Invalid(format!(
                "checksum {} is still used by client {}",
                checksum, client_id
            ))
            .into());
        }
        atomically(state, |overlay| {
            self.module.code_store().remove(overlay, checksum)?;
            self.module.invoker().release(overlay, checksum)?;
            Ok::<(), CoreError>(())
        })?;
        tracing::info!(target: "governance", %checksum, "module removed");
        Ok(())
    }

    /// Lifts the quarantine placed on a checksum after a schema mismatch.
    pub fn release_checksum(
        &self,
        state: &mut dyn StateAccess,
        checksum: &Checksum,
        caller: &Authority,
    ) -> Result<(), CoreError> {
        self.authorize(caller, "release_checksum")?;
        if !self.module.invoker().release(state, checksum)? {
            return Err(GovernanceError::Invalid(format!("checksum {} is not quarantined", checksum)).into());
        }
        tracing::info!(target: "governance", %checksum, "quarantine lifted");
        Ok(())
    }
}
