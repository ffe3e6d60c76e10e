// Path: crates/services/tests/sandbox_atomicity.rs

use ioi_lc_api::state::MemoryStore;
use ioi_lc_services::ibc::light_clients::wasm::msgs::{CallMsg, EmptyResult};
use ioi_lc_services::ibc::light_clients::wasm::{StoreScope, WasmLightClientModule};
use ioi_lc_test_utils::assert_err_matches;
use ioi_lc_test_utils::fixtures;
use ioi_lc_types::app::BlockEnv;
use ioi_lc_types::config::WasmConfig;
use ioi_lc_types::error::InvokeError;
use ioi_lc_types::ibc::{Checksum, ClientId};
use ioi_lc_vm_wasm::WasmRuntime;
use std::str::FromStr;
use std::sync::Arc;

/// A host backed by the wasmtime runtime with `fixtures::hostile_module` stored.
fn hostile_host() -> (WasmLightClientModule, MemoryStore, Checksum) {
    let config = WasmConfig::default();
    let module = WasmLightClientModule::new(Arc::new(WasmRuntime::from_config(&config).unwrap()), &config);
    let mut state = MemoryStore::new();
    let checksum = module
        .code_store()
        .put(&mut state, &fixtures::hostile_module())
        .unwrap();
    (module, state, checksum)
}

#[test]
fn trap_after_write_leaves_root_state_untouched() {
    let (module, mut state, checksum) = hostile_host();
    let invoker = module.invoker();
    let client_id = ClientId::from_str("08-wasm-0").unwrap();
    let before = state.clone();

    let msg = CallMsg::Instantiate {
        client_state: b"client".to_vec(),
        consensus_state: b"consensus".to_vec(),
        checksum,
    };
    assert_err_matches!(
        invoker.call::<EmptyResult>(
            &mut state,
            StoreScope::Client(&client_id),
            &checksum,
            &msg,
            &BlockEnv::new(1, 100),
        ),
        InvokeError::ModuleTrap(_)
    );
    assert_eq!(state, before);
}

#[test]
fn gas_exhaustion_after_write_leaves_root_state_untouched() {
    let (module, mut state, checksum) = hostile_host();
    let invoker = module.invoker();
    let client_id = ClientId::from_str("08-wasm-0").unwrap();
    let before = state.clone();

    let msg = CallMsg::UpdateState {
        client_message: b"header".to_vec(),
    };
    assert_err_matches!(
        invoker.call_with_gas::<EmptyResult>(
            &mut state,
            StoreScope::Client(&client_id),
            &checksum,
            &msg,
            &BlockEnv::new(1, 100),
            1_000_000,
        ),
        InvokeError::OutOfGas
    );
    assert_eq!(state, before);
    assert!(!invoker.is_quarantined(&state, &checksum).unwrap());
}
