// Path: crates/vm/wasm/src/host.rs
//! Host functions exposed to light-client modules under the `env` namespace.
//!
//! Every function charges fuel before touching the store, so a module that
//! hammers the store runs out of gas deterministically. Regions are passed as
//! `(ptr, len)` pairs and returned packed as `(ptr << 32) | len`.

use ioi_lc_api::state::StateAccess;
use ioi_lc_api::vm::{ALLOCATE_EXPORT, HOST_MODULE, MEMORY_EXPORT};
use ioi_lc_types::config::VmFuelCosts;
use ioi_lc_types::error::StateError;
use parity_scale_codec::Encode;
use wasmtime::{Caller, Linker, Memory, StoreLimits, Trap};

/// Returned by `db_read` when the key is absent.
pub const ABSENT: u64 = u64::MAX;

/// A failure of the host's own state backend, as opposed to a module fault.
#[derive(Debug, thiserror::Error)]
#[error("state backend failure: {0}")]
pub struct BackendFailure(pub String);

/// A module-visible store pointer valid for the duration of one `execute` call.
pub(crate) struct StorePtr(pub(crate) *mut (dyn StateAccess + 'static));

pub(crate) struct HostState {
    pub(crate) store: StorePtr,
    pub(crate) read_only: bool,
    pub(crate) fuel_costs: VmFuelCosts,
    pub(crate) max_key_bytes: usize,
    pub(crate) max_value_bytes: usize,
    pub(crate) limits: StoreLimits,
}

/// Packs a guest region into the `u64` return convention.
pub fn pack(ptr: u32, len: u32) -> u64 {
    (u64::from(ptr) << 32) | u64::from(len)
}

/// Splits a packed guest region into `(ptr, len)`.
pub fn unpack(packed: u64) -> (u32, u32) {
    ((packed >> 32) as u32, packed as u32)
}

fn with_store<R>(
    caller: &mut Caller<'_, HostState>,
    f: impl FnOnce(&mut dyn StateAccess) -> Result<R, StateError>,
) -> anyhow::Result<R> {
    let ptr = caller.data().store.0;
    // SAFETY: `ptr` was created from the `&mut dyn StateAccess` handed to
    // `WasmRuntime::execute`, which stays exclusively borrowed until the wasm
    // `Store` holding this `HostState` is dropped at the end of that call.
    let store = unsafe { &mut *ptr };
    f(store).map_err(|e| match e {
        StateError::Backend(_) | StateError::WriteError(_) | StateError::Decode(_) => {
            anyhow::Error::new(BackendFailure(e.to_string()))
        }
        other => anyhow::anyhow!("store access rejected: {}", other),
    })
}

fn charge(caller: &mut Caller<'_, HostState>, cost: u64) -> anyhow::Result<()> {
    let remaining = caller.get_fuel()?;
    if remaining < cost {
        caller.set_fuel(0)?;
        return Err(Trap::OutOfFuel.into());
    }
    caller.set_fuel(remaining - cost)?;
    Ok(())
}

fn guest_memory(caller: &mut Caller<'_, HostState>) -> anyhow::Result<Memory> {
    caller
        .get_export(MEMORY_EXPORT)
        .and_then(|e| e.into_memory())
        .ok_or_else(|| anyhow::anyhow!("module does not export '{}'", MEMORY_EXPORT))
}

fn read_guest(
    caller: &mut Caller<'_, HostState>,
    ptr: u32,
    len: u32,
    max: usize,
) -> anyhow::Result<Vec<u8>> {
    let len = len as usize;
    if len > max {
        anyhow::bail!("region of {} bytes exceeds limit of {}", len, max);
    }
    let memory = guest_memory(caller)?;
    let mut buf = vec![0u8; len];
    memory.read(&*caller, ptr as usize, &mut buf)?;
    Ok(buf)
}

fn write_guest(caller: &mut Caller<'_, HostState>, data: &[u8]) -> anyhow::Result<u64> {
    let allocate = caller
        .get_export(ALLOCATE_EXPORT)
        .and_then(|e| e.into_func())
        .ok_or_else(|| anyhow::anyhow!("module does not export '{}'", ALLOCATE_EXPORT))?
        .typed::<u32, u32>(&*caller)?;
    let len = u32::try_from(data.len())?;
    let ptr = allocate.call(&mut *caller, len)?;
    let memory = guest_memory(caller)?;
    memory.write(&mut *caller, ptr as usize, data)?;
    Ok(pack(ptr, len))
}

fn ensure_writable(caller: &Caller<'_, HostState>, op: &str) -> anyhow::Result<()> {
    if caller.data().read_only {
        anyhow::bail!("{} called from a read-only entry point", op);
    }
    Ok(())
}

fn per_byte(costs: &VmFuelCosts, per_byte: u64, len: usize) -> u64 {
    costs
        .base_cost
        .saturating_add(per_byte.saturating_mul(len as u64))
}

/// Registers `env.db_read`, `db_write`, `db_remove`, `db_scan` and `debug`.
pub(crate) fn add_to_linker(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(
        HOST_MODULE,
        "db_read",
        |mut caller: Caller<'_, HostState>, key_ptr: u32, key_len: u32| -> anyhow::Result<u64> {
            let max_key = caller.data().max_key_bytes;
            let key = read_guest(&mut caller, key_ptr, key_len, max_key)?;
            let costs = caller.data().fuel_costs.clone();
            charge(&mut caller, per_byte(&costs, costs.state_get_per_byte, key.len()))?;
            let value = with_store(&mut caller, |s| s.get(&key))?;
            match value {
                Some(value) => {
                    charge(&mut caller, costs.state_get_per_byte.saturating_mul(value.len() as u64))?;
                    write_guest(&mut caller, &value)
                }
                None => Ok(ABSENT),
            }
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "db_write",
        |mut caller: Caller<'_, HostState>,
         key_ptr: u32,
         key_len: u32,
         val_ptr: u32,
         val_len: u32|
         -> anyhow::Result<()> {
            ensure_writable(&caller, "db_write")?;
            let (max_key, max_value) = (caller.data().max_key_bytes, caller.data().max_value_bytes);
            let key = read_guest(&mut caller, key_ptr, key_len, max_key)?;
            let value = read_guest(&mut caller, val_ptr, val_len, max_value)?;
            let costs = caller.data().fuel_costs.clone();
            charge(
                &mut caller,
                per_byte(&costs, costs.state_set_per_byte, key.len() + value.len()),
            )?;
            with_store(&mut caller, |s| s.insert(&key, &value))
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "db_remove",
        |mut caller: Caller<'_, HostState>, key_ptr: u32, key_len: u32| -> anyhow::Result<()> {
            ensure_writable(&caller, "db_remove")?;
            let max_key = caller.data().max_key_bytes;
            let key = read_guest(&mut caller, key_ptr, key_len, max_key)?;
            let costs = caller.data().fuel_costs.clone();
            charge(&mut caller, per_byte(&costs, costs.state_set_per_byte, key.len()))?;
            with_store(&mut caller, |s| s.delete(&key))
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "db_scan",
        |mut caller: Caller<'_, HostState>, prefix_ptr: u32, prefix_len: u32| -> anyhow::Result<u64> {
            let (max_key, max_value) = (caller.data().max_key_bytes, caller.data().max_value_bytes);
            let prefix = read_guest(&mut caller, prefix_ptr, prefix_len, max_key)?;
            let costs = caller.data().fuel_costs.clone();
            charge(&mut caller, per_byte(&costs, costs.state_get_per_byte, prefix.len()))?;
            let pairs = with_store(&mut caller, |s| {
                let mut out: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
                let mut total = 0usize;
                for item in s.prefix_scan(&prefix)? {
                    let (k, v) = item?;
                    total = total.saturating_add(k.len() + v.len());
                    if total > max_value {
                        return Err(StateError::InvalidValue(format!(
                            "scan result exceeds {} bytes",
                            max_value
                        )));
                    }
                    out.push((k.to_vec(), v.to_vec()));
                }
                Ok(out)
            })?;
            let encoded = pairs.encode();
            charge(
                &mut caller,
                costs.state_get_per_byte.saturating_mul(encoded.len() as u64),
            )?;
            write_guest(&mut caller, &encoded)
        },
    )?;

    linker.func_wrap(
        HOST_MODULE,
        "debug",
        |mut caller: Caller<'_, HostState>, msg_ptr: u32, msg_len: u32| -> anyhow::Result<()> {
            let max_value = caller.data().max_value_bytes;
            let base = caller.data().fuel_costs.base_cost;
            charge(&mut caller, base)?;
            let msg = read_guest(&mut caller, msg_ptr, msg_len, max_value)?;
            log::debug!(target: "wasm_vm", "module: {}", String::from_utf8_lossy(&msg));
            Ok(())
        },
    )?;

    Ok(())
}
