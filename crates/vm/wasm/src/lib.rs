// Path: crates/vm/wasm/src/lib.rs
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]
//! # IOI Light-Client WASM Runtime
//!
//! A deterministic, fuel-metered wasmtime engine implementing the light-client
//! module ABI described in [`ioi_lc_api::vm`].
//!
//! Determinism: fuel metering is the only timeout, NaN bit patterns are
//! canonicalised, threads and relaxed SIMD are disabled and no WASI context is
//! linked, so a module can observe nothing except its input and its store.

mod host;

pub use host::{pack, unpack, BackendFailure, ABSENT};

use host::{HostState, StorePtr};
use ioi_lc_api::state::StateAccess;
use ioi_lc_api::vm::{
    EntryPoint, ExecutionContext, ExecutionOutput, VirtualMachine, ABI_VERSION_EXPORT,
    ALLOCATE_EXPORT, HOST_IMPORTS, HOST_MODULE, MEMORY_EXPORT,
};
use ioi_lc_types::config::{VmFuelCosts, WasmConfig};
use ioi_lc_types::error::VmError;
use ioi_lc_types::ibc::Checksum;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use wasmtime::{Config, Engine, ExternType, Linker, Module, Store, StoreLimitsBuilder, Trap, ValType};

/// Limits applied to every instance created by a [`WasmRuntime`].
#[derive(Debug, Clone)]
pub struct RuntimeLimits {
    /// Maximum linear memory per instance, in bytes.
    pub memory_limit_bytes: usize,
    /// Maximum key length accepted by store host functions.
    pub max_key_bytes: usize,
    /// Maximum value (and scan result) length accepted by store host functions.
    pub max_value_bytes: usize,
    /// Number of compiled modules kept in the cache.
    pub module_cache_capacity: usize,
}

impl From<&WasmConfig> for RuntimeLimits {
    fn from(config: &WasmConfig) -> Self {
        Self {
            memory_limit_bytes: config.memory_limit_bytes,
            max_key_bytes: config.max_key_bytes,
            max_value_bytes: config.max_value_bytes,
            module_cache_capacity: config.module_cache_capacity,
        }
    }
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        Self::from(&WasmConfig::default())
    }
}

pub struct WasmRuntime {
    engine: Engine,
    linker: Linker<HostState>,
    fuel_costs: VmFuelCosts,
    limits: RuntimeLimits,
    module_cache: Mutex<LruCache<Checksum, Module>>,
}

impl WasmRuntime {
    pub fn new(fuel_costs: VmFuelCosts, limits: RuntimeLimits) -> Result<Self, VmError> {
        let mut config = Config::new();
        config.consume_fuel(true);
        config.cranelift_nan_canonicalization(true);
        config.wasm_threads(false);
        config.wasm_relaxed_simd(false);
        config.wasm_multi_memory(false);
        config.wasm_memory64(false);

        let engine = Engine::new(&config).map_err(|e| VmError::Initialization(e.to_string()))?;

        let mut linker = Linker::new(&engine);
        host::add_to_linker(&mut linker).map_err(|e| VmError::Initialization(e.to_string()))?;

        let capacity = NonZeroUsize::new(limits.module_cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            engine,
            linker,
            fuel_costs,
            limits,
            module_cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Builds a runtime from the host configuration.
    pub fn from_config(config: &WasmConfig) -> Result<Self, VmError> {
        Self::new(config.fuel_costs.clone(), RuntimeLimits::from(config))
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn compile(&self, code: &[u8]) -> Result<Module, VmError> {
        let module =
            Module::new(&self.engine, code).map_err(|e| VmError::InvalidBytecode(e.to_string()))?;
        check_abi(&module)?;
        // Resolves every import against the host functions with matching signatures.
        self.linker
            .instantiate_pre(&module)
            .map_err(|e| VmError::InvalidBytecode(format!("unresolvable imports: {}", e)))?;
        Ok(module)
    }

    fn load_module(&self, checksum: &Checksum, code: &[u8]) -> Result<Module, VmError> {
        if let Some(module) = self.module_cache.lock().get(checksum) {
            return Ok(module.clone());
        }
        let module = self.compile(code)?;
        self.module_cache.lock().put(*checksum, module.clone());
        log::debug!(target: "wasm_vm", "compiled module {}", checksum);
        Ok(module)
    }

    fn run(
        &self,
        store: &mut Store<HostState>,
        module: &Module,
        entry_point: EntryPoint,
        input: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        let instance = self.linker.instantiate(&mut *store, module)?;
        let memory = instance
            .get_memory(&mut *store, MEMORY_EXPORT)
            .ok_or_else(|| anyhow::anyhow!("module must export '{}'", MEMORY_EXPORT))?;
        let allocate = instance.get_typed_func::<u32, u32>(&mut *store, ALLOCATE_EXPORT)?;
        let entry =
            instance.get_typed_func::<(u32, u32), u64>(&mut *store, entry_point.export_name())?;

        let input_len = u32::try_from(input.len())?;
        let input_ptr = allocate.call(&mut *store, input_len)?;
        memory.write(&mut *store, input_ptr as usize, input)?;

        let (result_ptr, result_len) = unpack(entry.call(&mut *store, (input_ptr, input_len))?);
        if result_len as usize > self.limits.max_value_bytes {
            anyhow::bail!(
                "result of {} bytes exceeds limit of {}",
                result_len,
                self.limits.max_value_bytes
            );
        }
        let mut result = vec![0u8; result_len as usize];
        memory.read(&*store, result_ptr as usize, &mut result)?;
        Ok(result)
    }
}

fn is_out_of_fuel(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<Trap>(), Some(Trap::OutOfFuel)))
}

fn classify(err: anyhow::Error) -> VmError {
    if is_out_of_fuel(&err) {
        return VmError::OutOfGas;
    }
    if let Some(failure) = err.chain().find_map(|c| c.downcast_ref::<BackendFailure>()) {
        return VmError::HostError(failure.to_string());
    }
    VmError::ExecutionTrap(format!("{:#}", err))
}

#[derive(Clone, Copy)]
enum Kind {
    I32,
    I64,
}

fn signature_is(actual: impl ExactSizeIterator<Item = ValType>, expected: &[Kind]) -> bool {
    actual.len() == expected.len()
        && actual.zip(expected).all(|(v, k)| {
            matches!((v, k), (ValType::I32, Kind::I32) | (ValType::I64, Kind::I64))
        })
}

fn check_func(module: &Module, name: &str, params: &[Kind], results: &[Kind]) -> Result<(), VmError> {
    let ty = module
        .get_export(name)
        .ok_or_else(|| VmError::InvalidBytecode(format!("missing export '{}'", name)))?;
    let func = match ty {
        ExternType::Func(func) => func,
        _ => {
            return Err(VmError::InvalidBytecode(format!(
                "export '{}' must be a function",
                name
            )))
        }
    };
    if !signature_is(func.params(), params) || !signature_is(func.results(), results) {
        return Err(VmError::InvalidBytecode(format!(
            "export '{}' has the wrong signature",
            name
        )));
    }
    Ok(())
}

fn check_abi(module: &Module) -> Result<(), VmError> {
    for import in module.imports() {
        if import.module() != HOST_MODULE || !HOST_IMPORTS.contains(&import.name()) {
            return Err(VmError::InvalidBytecode(format!(
                "import '{}.{}' is not a host function",
                import.module(),
                import.name()
            )));
        }
    }
    match module.get_export(MEMORY_EXPORT) {
        Some(ExternType::Memory(_)) => {}
        _ => {
            return Err(VmError::InvalidBytecode(format!(
                "missing memory export '{}'",
                MEMORY_EXPORT
            )))
        }
    }
    check_func(module, ABI_VERSION_EXPORT, &[], &[])?;
    check_func(module, ALLOCATE_EXPORT, &[Kind::I32], &[Kind::I32])?;
    for entry_point in EntryPoint::ALL {
        check_func(module, entry_point.export_name(), &[Kind::I32, Kind::I32], &[Kind::I64])?;
    }
    Ok(())
}

impl VirtualMachine for WasmRuntime {
    fn validate(&self, code: &[u8]) -> Result<(), VmError> {
        self.compile(code).map(|_| ())
    }

    fn execute(
        &self,
        checksum: &Checksum,
        code: &[u8],
        entry_point: EntryPoint,
        input: &[u8],
        store: &mut dyn StateAccess,
        context: ExecutionContext,
    ) -> Result<ExecutionOutput, VmError> {
        if context.gas_limit == 0 {
            return Err(VmError::OutOfGas);
        }
        let module = self.load_module(checksum, code)?;

        let raw: *mut (dyn StateAccess + '_) = store;
        // SAFETY: only the lifetime is erased. The pointer is dereferenced by host
        // functions while `wasm_store` is alive, and `wasm_store` is dropped before
        // this function returns, so `store` outlives every use.
        let raw: *mut (dyn StateAccess + 'static) = unsafe { std::mem::transmute(raw) };

        let host_state = HostState {
            store: StorePtr(raw),
            read_only: entry_point.is_read_only(),
            fuel_costs: self.fuel_costs.clone(),
            max_key_bytes: self.limits.max_key_bytes,
            max_value_bytes: self.limits.max_value_bytes,
            limits: StoreLimitsBuilder::new()
                .memory_size(self.limits.memory_limit_bytes)
                .instances(1)
                .build(),
        };
        let mut wasm_store = Store::new(&self.engine, host_state);
        wasm_store.limiter(|state| &mut state.limits);
        wasm_store
            .set_fuel(context.gas_limit)
            .map_err(|e| VmError::Initialization(e.to_string()))?;

        let result = self.run(&mut wasm_store, &module, entry_point, input);
        let remaining = wasm_store.get_fuel().unwrap_or(0);
        drop(wasm_store);
        let gas_used = context.gas_limit.saturating_sub(remaining);

        match result {
            Ok(return_data) => {
                log::trace!(
                    target: "wasm_vm",
                    "{} {} used {} gas",
                    checksum,
                    entry_point,
                    gas_used
                );
                Ok(ExecutionOutput {
                    gas_used,
                    return_data,
                })
            }
            Err(e) => Err(classify(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_out_of_fuel_through_context() {
        let err = anyhow::Error::from(Trap::OutOfFuel).context("wasm backtrace");
        assert!(matches!(classify(err), VmError::OutOfGas));
    }

    #[test]
    fn classifies_backend_failures_as_host_errors() {
        let err = anyhow::Error::new(BackendFailure("disk".into()));
        assert!(matches!(classify(err), VmError::HostError(_)));
        let err = anyhow::anyhow!("store access rejected");
        assert!(matches!(classify(err), VmError::ExecutionTrap(_)));
    }
}
