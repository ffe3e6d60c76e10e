// Path: crates/vm/wasm/tests/sandbox.rs

use ioi_lc_api::state::{ClientStore, MemoryStore, StateAccess};
use ioi_lc_api::vm::{EntryPoint, ExecutionContext, VirtualMachine};
use ioi_lc_crypto::algorithms::hash::checksum_of;
use ioi_lc_test_utils::fixtures;
use ioi_lc_types::error::VmError;
use ioi_lc_types::ibc::ClientId;
use ioi_lc_vm_wasm::WasmRuntime;
use std::str::FromStr;

const GAS: u64 = 10_000_000;

fn runtime() -> WasmRuntime {
    WasmRuntime::from_config(&Default::default()).unwrap()
}

fn client() -> ClientId {
    ClientId::from_str("08-wasm-0").unwrap()
}

fn exec(
    vm: &WasmRuntime,
    code: &[u8],
    entry_point: EntryPoint,
    input: &[u8],
    store: &mut dyn StateAccess,
    gas: u64,
) -> Result<(Vec<u8>, u64), VmError> {
    vm.execute(
        &checksum_of(code),
        code,
        entry_point,
        input,
        store,
        ExecutionContext::with_gas_limit(gas),
    )
    .map(|out| (out.return_data, out.gas_used))
}

#[test]
fn validate_accepts_abi_conforming_module() {
    runtime().validate(&fixtures::echo_module()).unwrap();
    runtime().validate(&fixtures::hostile_module()).unwrap();
}

#[test]
fn validate_rejects_modules_outside_the_abi() {
    let vm = runtime();
    for code in [
        fixtures::unmarked_module(),
        fixtures::clock_importing_module(),
        b"not wasm at all".to_vec(),
    ] {
        assert!(matches!(vm.validate(&code), Err(VmError::InvalidBytecode(_))));
    }
}

#[test]
fn module_writes_land_inside_the_client_namespace() {
    let vm = runtime();
    let code = fixtures::echo_module();
    let mut root = MemoryStore::new();
    let id = client();

    let (echo, gas_used) = {
        let mut store = ClientStore::new(&mut root, &id);
        exec(&vm, &code, EntryPoint::Instantiate, b"hello", &mut store, GAS).unwrap()
    };
    assert_eq!(echo, b"hello");
    assert!(gas_used > 0 && gas_used <= GAS);
    assert_eq!(root.len(), 1);
    assert_eq!(
        root.get(b"ibc::clients::08-wasm-0/k").unwrap(),
        Some(b"hello".to_vec())
    );

    let mut store = ClientStore::read_only(&root, &id);
    let (value, _) = exec(&vm, &code, EntryPoint::Query, b"", &mut store, GAS).unwrap();
    assert_eq!(value, b"hello");
}

#[test]
fn query_of_missing_key_returns_empty_region() {
    let vm = runtime();
    let root = MemoryStore::new();
    let mut store = ClientStore::read_only(&root, &client());
    let (value, _) = exec(&vm, &fixtures::echo_module(), EntryPoint::Query, b"", &mut store, GAS).unwrap();
    assert!(value.is_empty());
}

#[test]
fn execution_is_deterministic_across_runtimes() {
    let code = fixtures::echo_module();
    let run = || {
        let vm = runtime();
        let mut root = MemoryStore::new();
        let out = {
            let mut store = ClientStore::new(&mut root, &client());
            exec(&vm, &code, EntryPoint::Sudo, b"{\"msg\":1}", &mut store, GAS).unwrap()
        };
        (out, root)
    };
    let (first, first_store) = run();
    let (second, second_store) = run();
    assert_eq!(first, second);
    assert_eq!(first_store, second_store);
}

#[test]
fn trap_is_classified_as_execution_trap() {
    let vm = runtime();
    let mut root = MemoryStore::new();
    let mut store = ClientStore::new(&mut root, &client());
    let err = exec(&vm, &fixtures::hostile_module(), EntryPoint::Instantiate, b"x", &mut store, GAS)
        .unwrap_err();
    assert!(matches!(err, VmError::ExecutionTrap(_)), "{:?}", err);
}

#[test]
fn infinite_loop_runs_out_of_gas() {
    let vm = runtime();
    let mut root = MemoryStore::new();
    let mut store = ClientStore::new(&mut root, &client());
    let err = exec(&vm, &fixtures::hostile_module(), EntryPoint::Sudo, b"x", &mut store, 100_000)
        .unwrap_err();
    assert!(matches!(err, VmError::OutOfGas), "{:?}", err);
}

#[test]
fn zero_gas_faults_before_running() {
    let vm = runtime();
    let mut root = MemoryStore::new();
    {
        let mut store = ClientStore::new(&mut root, &client());
        let err = exec(&vm, &fixtures::echo_module(), EntryPoint::Instantiate, b"x", &mut store, 0)
            .unwrap_err();
        assert!(matches!(err, VmError::OutOfGas));
    }
    assert!(root.is_empty());
}

#[test]
fn host_call_cost_exceeding_budget_is_out_of_gas() {
    let vm = runtime();
    let mut root = MemoryStore::new();
    {
        let mut store = ClientStore::new(&mut root, &client());
        // Enough fuel for the guest prologue, not for the db_write charge.
        let err = exec(&vm, &fixtures::echo_module(), EntryPoint::Instantiate, b"x", &mut store, 500)
            .unwrap_err();
        assert!(matches!(err, VmError::OutOfGas), "{:?}", err);
    }
    assert!(root.is_empty());
}

#[test]
fn query_entry_point_cannot_write() {
    let vm = runtime();
    let mut root = MemoryStore::new();
    let mut store = ClientStore::new(&mut root, &client());
    let err = exec(&vm, &fixtures::hostile_module(), EntryPoint::Query, b"x", &mut store, GAS)
        .unwrap_err();
    assert!(matches!(err, VmError::ExecutionTrap(_)), "{:?}", err);
    drop(store);
    assert!(root.is_empty());
}
