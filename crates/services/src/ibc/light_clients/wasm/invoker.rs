// Path: crates/services/src/ibc/light_clients/wasm/invoker.rs

//! The synchronous call boundary between the host and a light-client module.

use super::code_store::CodeStore;
use super::msgs::{CallEnvelope, CallMsg, CallResponse};
use ioi_lc_api::state::{ClientStore, StateAccess, StateOverlay, SubstituteStore};
use ioi_lc_api::vm::{EntryPoint, ExecutionContext, VirtualMachine};
use ioi_lc_types::app::BlockEnv;
use ioi_lc_types::config::GasLimits;
use ioi_lc_types::error::{CodeError, InvokeError, StateError};
use ioi_lc_types::ibc::{Checksum, ClientId};
use ioi_lc_types::keys::{quarantine_key, QUARANTINE_PREFIX};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Which part of the host state a call may see.
#[derive(Debug, Clone, Copy)]
pub enum StoreScope<'a> {
    /// The namespace of a single client.
    Client(&'a ClientId),
    /// Substitute recovery: `subject/` and `substitute/` routed to two namespaces.
    Recovery {
        subject: &'a ClientId,
        substitute: &'a ClientId,
    },
}

impl<'a> StoreScope<'a> {
    /// The client the call is made on behalf of.
    pub fn client_id(&self) -> &'a ClientId {
        match self {
            StoreScope::Client(id) => id,
            StoreScope::Recovery { subject, .. } => subject,
        }
    }
}

/// Runs module calls deterministically and all-or-nothing.
///
/// Writes made by a `sudo` or `instantiate` call are buffered in a
/// [`StateOverlay`] and applied to the caller's state with a single
/// `batch_apply` only when the call returns a decodable result. A rejection or
/// any fault leaves the caller's state untouched.
///
/// A result that fails to decode halts the checksum: a record under
/// `ibc::wasm::quarantine::<checksum>` is written to the caller's state
/// outside the discarded call, and every later call to the checksum fails
/// `Quarantined` until governance removes the record. The halt lives in state,
/// so every node replaying the same blocks answers the same way. A query
/// cannot write, so a mismatch seen by a query is reported but recorded only
/// once a state-changing call hits it.
pub struct SandboxInvoker {
    vm: Arc<dyn VirtualMachine>,
    code_store: Arc<CodeStore>,
    gas_limits: GasLimits,
}

/// Records the halt of `checksum`. Idempotent.
pub(crate) fn record_quarantine(state: &mut dyn StateAccess, checksum: &Checksum) -> Result<(), StateError> {
    let key = quarantine_key(checksum);
    if state.get(&key)?.is_none() {
        state.insert(&key, &[1])?;
        tracing::warn!(target: "ibc_wasm", %checksum, "module quarantined after schema mismatch");
    }
    Ok(())
}

impl SandboxInvoker {
    pub fn new(vm: Arc<dyn VirtualMachine>, code_store: Arc<CodeStore>, gas_limits: GasLimits) -> Self {
        Self {
            vm,
            code_store,
            gas_limits,
        }
    }

    /// The configured gas limit of an entry point.
    pub fn gas_limit(&self, entry_point: EntryPoint) -> u64 {
        match entry_point {
            EntryPoint::Instantiate => self.gas_limits.instantiate,
            EntryPoint::Sudo => self.gas_limits.sudo,
            EntryPoint::Query => self.gas_limits.query,
        }
    }

    pub fn is_quarantined(&self, state: &dyn StateAccess, checksum: &Checksum) -> Result<bool, StateError> {
        Ok(state.get(&quarantine_key(checksum))?.is_some())
    }

    /// Lifts a quarantine. Returns false if the checksum was not quarantined.
    pub fn release(&self, state: &mut dyn StateAccess, checksum: &Checksum) -> Result<bool, StateError> {
        if !self.is_quarantined(&*state, checksum)? {
            return Ok(false);
        }
        state.delete(&quarantine_key(checksum))?;
        Ok(true)
    }

    /// Checksums currently quarantined, in ascending order.
    pub fn quarantined(&self, state: &dyn StateAccess) -> Result<Vec<Checksum>, StateError> {
        let mut out = Vec::new();
        for item in state.prefix_scan(QUARANTINE_PREFIX)? {
            let (key, _) = item?;
            if let Some(checksum) = key
                .get(QUARANTINE_PREFIX.len()..)
                .and_then(Checksum::from_slice)
            {
                out.push(checksum);
            }
        }
        Ok(out)
    }

    /// Calls a module with the configured gas limit of the message's entry point.
    ///
    /// Query messages run against a read-only view of `state`; every other
    /// message commits its writes to `state` on success.
    pub fn call<R: DeserializeOwned>(
        &self,
        state: &mut dyn StateAccess,
        scope: StoreScope<'_>,
        checksum: &Checksum,
        msg: &CallMsg,
        env: &BlockEnv,
    ) -> Result<R, InvokeError> {
        let gas_limit = self.gas_limit(msg.entry_point());
        self.call_with_gas(state, scope, checksum, msg, env, gas_limit)
    }

    /// Like [`SandboxInvoker::call`] with an explicit gas limit.
    pub fn call_with_gas<R: DeserializeOwned>(
        &self,
        state: &mut dyn StateAccess,
        scope: StoreScope<'_>,
        checksum: &Checksum,
        msg: &CallMsg,
        env: &BlockEnv,
        gas_limit: u64,
    ) -> Result<R, InvokeError> {
        if msg.entry_point().is_read_only() {
            return self.query_with_gas(&*state, scope.client_id(), checksum, msg, env, gas_limit);
        }
        let mut overlay = StateOverlay::new(&*state);
        match self.run(&mut overlay, scope, checksum, msg, env, gas_limit) {
            Ok(result) => {
                let (inserts, deletes) = overlay.into_ordered_batch();
                state.batch_apply(&inserts, &deletes)?;
                Ok(result)
            }
            Err(e) => {
                drop(overlay);
                if let InvokeError::SchemaMismatch { checksum, .. } = &e {
                    record_quarantine(state, checksum)?;
                }
                Err(e)
            }
        }
    }

    /// Runs a read-only message against `state` with the configured query gas limit.
    pub fn query<R: DeserializeOwned>(
        &self,
        state: &dyn StateAccess,
        client_id: &ClientId,
        checksum: &Checksum,
        msg: &CallMsg,
        env: &BlockEnv,
    ) -> Result<R, InvokeError> {
        self.query_with_gas(state, client_id, checksum, msg, env, self.gas_limits.query)
    }

    fn query_with_gas<R: DeserializeOwned>(
        &self,
        state: &dyn StateAccess,
        client_id: &ClientId,
        checksum: &Checksum,
        msg: &CallMsg,
        env: &BlockEnv,
        gas_limit: u64,
    ) -> Result<R, InvokeError> {
        let mut store = ClientStore::read_only(state, client_id);
        let result = self.execute(&*state, &mut store, checksum, msg, env, gas_limit);
        self.finish(client_id, checksum, msg, result)
    }

    fn run<R: DeserializeOwned>(
        &self,
        overlay: &mut StateOverlay<'_>,
        scope: StoreScope<'_>,
        checksum: &Checksum,
        msg: &CallMsg,
        env: &BlockEnv,
        gas_limit: u64,
    ) -> Result<R, InvokeError> {
        // The module bytes live outside every client namespace, so they are
        // loaded through the overlay before a scoped handle is created.
        let result = self.load(&*overlay, checksum).and_then(|code| match scope {
            StoreScope::Client(id) => {
                let mut store = ClientStore::new(&mut *overlay, id);
                self.execute_code(&code, &mut store, checksum, msg, env, gas_limit)
            }
            StoreScope::Recovery { subject, substitute } => {
                let mut store = SubstituteStore::new(&mut *overlay, subject, substitute);
                self.execute_code(&code, &mut store, checksum, msg, env, gas_limit)
            }
        });
        self.finish(scope.client_id(), checksum, msg, result)
    }

    fn load(&self, state: &dyn StateAccess, checksum: &Checksum) -> Result<Vec<u8>, InvokeError> {
        if self.is_quarantined(state, checksum)? {
            return Err(InvokeError::Quarantined(*checksum));
        }
        self.code_store.get(state, checksum).map_err(|e| match e {
            CodeError::NotFound(c) => InvokeError::ModuleNotFound(c),
            CodeError::State(s) => InvokeError::State(s),
            other => InvokeError::Host(other.to_string()),
        })
    }

    fn execute(
        &self,
        code_source: &dyn StateAccess,
        store: &mut dyn StateAccess,
        checksum: &Checksum,
        msg: &CallMsg,
        env: &BlockEnv,
        gas_limit: u64,
    ) -> Result<Vec<u8>, InvokeError> {
        let code = self.load(code_source, checksum)?;
        self.execute_code(&code, store, checksum, msg, env, gas_limit)
    }

    fn execute_code(
        &self,
        code: &[u8],
        store: &mut dyn StateAccess,
        checksum: &Checksum,
        msg: &CallMsg,
        env: &BlockEnv,
        gas_limit: u64,
    ) -> Result<Vec<u8>, InvokeError> {
        let input = serde_json::to_vec(&CallEnvelope { env, msg })
            .map_err(|e| InvokeError::Host(format!("failed to encode call: {}", e)))?;
        let output = self.vm.execute(
            checksum,
            code,
            msg.entry_point(),
            &input,
            store,
            ExecutionContext::with_gas_limit(gas_limit),
        )?;
        tracing::trace!(
            target: "ibc_wasm",
            %checksum,
            msg = msg.name(),
            gas_used = output.gas_used,
            "module call returned"
        );
        Ok(output.return_data)
    }

    /// Decodes the module's answer and logs faults with the client and checksum.
    fn finish<R: DeserializeOwned>(
        &self,
        client_id: &ClientId,
        checksum: &Checksum,
        msg: &CallMsg,
        raw: Result<Vec<u8>, InvokeError>,
    ) -> Result<R, InvokeError> {
        let result = raw.and_then(|raw| match serde_json::from_slice::<CallResponse<R>>(&raw) {
            Ok(CallResponse::Ok(result)) => Ok(result),
            Ok(CallResponse::Error(reason)) => Err(InvokeError::Rejected(reason)),
            Err(e) => Err(InvokeError::SchemaMismatch {
                checksum: *checksum,
                reason: format!("undecodable {} result: {}", msg.name(), e),
            }),
        });
        if let Err(e) = &result {
            if e.is_fault() {
                tracing::error!(
                    target: "ibc_wasm",
                    %client_id,
                    %checksum,
                    msg = msg.name(),
                    error = %e,
                    "light client module call faulted"
                );
            } else {
                tracing::debug!(
                    target: "ibc_wasm",
                    %client_id,
                    msg = msg.name(),
                    error = %e,
                    "light client module rejected call"
                );
            }
        }
        result
    }
}
