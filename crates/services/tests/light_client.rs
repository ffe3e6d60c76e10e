// Path: crates/services/tests/light_client.rs

mod common;

use common::{env, h, valid_header, Harness, CHAIN, GENESIS_ROOT, GENESIS_TIME, TRUSTING_PERIOD};
use ioi_lc_services::ibc::light_clients::wasm::msgs::{CallMsg, GenesisMetadata, StatusResult};
use ioi_lc_services::ibc::light_clients::wasm::{
    ProofRequest, StoreScope, UpdateOutcome, UpgradeRequest, WasmClientState, WasmConsensusState,
    WasmLightClientModule,
};
use ioi_lc_test_utils::{assert_err_matches, MockLightClientVm};
use ioi_lc_test_utils::assertions::dump_prefix;
use ioi_lc_test_utils::mock_client::{
    self, client_state_bytes, consensus_state_bytes, header, header_bytes, membership_proof,
    misbehaviour_bytes, non_membership_proof, upgrade_proofs, MOCK_CLIENT_BAD_SCHEMA,
    MOCK_CLIENT_TRAP, MOCK_CLIENT_V1,
};
use ioi_lc_types::app::BlockEnv;
use ioi_lc_types::config::WasmConfig;
use ioi_lc_types::error::{ClientError, InvokeError};
use ioi_lc_types::ibc::{Checksum, Height, Status};
use ioi_lc_types::keys::{client_store_prefix, CLIENT_STORE_PREFIX};
use std::sync::Arc;

fn proof_request(height: Height, proof: Vec<u8>, path: &[u8]) -> ProofRequest {
    ProofRequest {
        height,
        delay_time_period: 0,
        delay_block_period: 0,
        proof,
        path: path.to_vec(),
    }
}

#[test]
fn upload_instantiate_reject_forgery_then_update_and_verify() {
    let mut t = Harness::new();
    let checksum = t.store(MOCK_CLIENT_V1);
    let id = t.create(checksum, 1);
    assert_eq!(id.as_str(), "08-wasm-0");

    let client = t.gateway.module().client(&t.state, &id, env()).unwrap();
    assert_eq!(client.status(&t.state).unwrap(), Status::Active);

    let forged = header_bytes("chain-evil", h(2), 200, b"root-2");
    let before = t.state.clone();
    assert_err_matches!(
        t.gateway.module().update_client(&mut t.state, env(), &id, &forged),
        ClientError::InvalidClientMessage(_)
    );
    assert_eq!(t.state, before);
    assert_eq!(client.status(&t.state).unwrap(), Status::Active);
    assert!(WasmConsensusState::try_load(&t.state, &id, &h(2)).unwrap().is_none());

    let outcome = t
        .gateway
        .module()
        .update_client(&mut t.state, env(), &id, &valid_header(2, b"root-2"))
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Updated(vec![h(2)]));
    assert_eq!(WasmClientState::load(&t.state, &id).unwrap().latest_height, h(2));

    let proof = membership_proof(b"root-2", b"ports/transfer", b"value");
    client
        .verify_membership(&mut t.state, &proof_request(h(2), proof, b"ports/transfer"), b"value")
        .unwrap();
    let absent = non_membership_proof(b"root-2", b"ports/unknown");
    client
        .verify_non_membership(&mut t.state, &proof_request(h(2), absent, b"ports/unknown"))
        .unwrap();
}

#[test]
fn membership_needs_a_consensus_state_and_a_valid_proof() {
    let mut t = Harness::new();
    let checksum = t.store(MOCK_CLIENT_V1);
    let id = t.create(checksum, 1);
    let client = t.gateway.module().client(&t.state, &id, env()).unwrap();
    let before = t.state.clone();

    let proof = membership_proof(GENESIS_ROOT, b"a", b"b");
    let err = assert_err_matches!(
        client.verify_membership(&mut t.state, &proof_request(h(7), proof.clone(), b"a"), b"b"),
        ClientError::ConsensusStateNotFound { .. }
    );
    assert!(err.is_not_found());

    assert_err_matches!(
        client.verify_membership(&mut t.state, &proof_request(h(1), proof.clone(), b"a"), b"c"),
        ClientError::InvalidProof(_)
    );
    client
        .verify_membership(&mut t.state, &proof_request(h(1), proof, b"a"), b"b")
        .unwrap();
    assert_eq!(t.state, before);
}

#[test]
fn misbehaviour_freezes_the_client() {
    let mut t = Harness::new();
    let checksum = t.store(MOCK_CLIENT_V1);
    let id = t.create(checksum, 1);

    let conflicting = valid_header(1, b"another-root");
    let outcome = t
        .gateway
        .module()
        .update_client(&mut t.state, env(), &id, &conflicting)
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Frozen);

    let client = t.gateway.module().client(&t.state, &id, env()).unwrap();
    assert_eq!(client.status(&t.state).unwrap(), Status::Frozen);
    assert_err_matches!(
        t.gateway.module().update_client(&mut t.state, env(), &id, &valid_header(2, b"root-2")),
        ClientError::UnexpectedStatus { status: Status::Frozen, .. }
    );
}

#[test]
fn explicit_misbehaviour_evidence_freezes_the_client() {
    let mut t = Harness::new();
    let checksum = t.store(MOCK_CLIENT_V1);
    let id = t.create(checksum, 1);
    let evidence = misbehaviour_bytes(
        header(CHAIN, h(5), 105, b"fork-a"),
        header(CHAIN, h(5), 105, b"fork-b"),
    );
    let client = t.gateway.module().client(&t.state, &id, env()).unwrap();
    let verified = client.verify_client_message(&t.state, &evidence).unwrap();
    assert!(client.check_for_misbehaviour(&mut t.state, &verified).unwrap());
    client.update_state_on_misbehaviour(&mut t.state, verified).unwrap();
    assert!(mock_client::read_client_state(&t.state, &id).unwrap().frozen);
}

#[test]
fn clients_never_see_each_other() {
    let mut t = Harness::new();
    let checksum = t.store(MOCK_CLIENT_V1);
    let a = t.create(checksum, 1);
    let b = t.create(checksum, 1);
    let b_before = dump_prefix(&t.state, &client_store_prefix(&b));

    t.gateway
        .module()
        .update_client(&mut t.state, env(), &a, &valid_header(3, b"root-3"))
        .unwrap();

    assert_eq!(dump_prefix(&t.state, &client_store_prefix(&b)), b_before);
    assert!(WasmConsensusState::try_load(&t.state, &a, &h(3)).unwrap().is_some());
    assert!(WasmConsensusState::try_load(&t.state, &b, &h(3)).unwrap().is_none());
    assert_eq!(
        t.gateway.module().clients(&t.state).unwrap(),
        vec![(a, checksum), (b, checksum)]
    );
}

#[test]
fn identical_calls_yield_identical_results_and_stores() {
    let run = || {
        let mut t = Harness::new();
        let checksum = t.store(MOCK_CLIENT_V1);
        let id = t.create(checksum, 1);
        let outcome = t
            .gateway
            .module()
            .update_client(&mut t.state, env(), &id, &valid_header(4, b"root-4"))
            .unwrap();
        let timestamp = t
            .gateway
            .module()
            .client(&t.state, &id, env())
            .unwrap()
            .timestamp_at_height(&t.state, &h(4))
            .unwrap();
        (outcome, timestamp, t.state)
    };
    let (outcome_a, ts_a, state_a) = run();
    let (outcome_b, ts_b, state_b) = run();
    assert_eq!(outcome_a, outcome_b);
    assert_eq!(ts_a, ts_b);
    assert_eq!(ts_a, GENESIS_TIME + 4);
    assert_eq!(state_a, state_b);
}

#[test]
fn faulted_calls_leave_the_store_untouched() {
    let mut t = Harness::new();
    let trap = t.store(MOCK_CLIENT_TRAP);
    let before = t.state.clone();
    let (client_state, consensus_state) = t.genesis(trap, 1);
    let err = assert_err_matches!(
        t.gateway
            .module()
            .create_client(&mut t.state, env(), &client_state, &consensus_state),
        ClientError::Invoke(InvokeError::ModuleTrap(_))
    );
    assert!(err.is_fatal());
    assert_eq!(t.state, before);

    let v1 = t.store(MOCK_CLIENT_V1);
    let id = t.create(v1, 1);
    let before = t.state.clone();
    let msg = CallMsg::UpdateState {
        client_message: valid_header(2, b"root-2"),
    };
    for _ in 0..2 {
        let result = t.gateway.module().invoker().call_with_gas::<StatusResult>(
            &mut t.state,
            StoreScope::Client(&id),
            &v1,
            &msg,
            &env(),
            0,
        );
        assert!(matches!(result, Err(InvokeError::OutOfGas)));
        assert_eq!(t.state, before);
    }
}

#[test]
fn create_client_validates_its_inputs() {
    let mut t = Harness::new();
    let checksum = t.store(MOCK_CLIENT_V1);
    let (client_state, consensus_state) = t.genesis(checksum, 1);
    let before = t.state.clone();

    let unknown = WasmClientState::new(client_state.data.clone(), Checksum::new([9; 32]), h(1));
    assert_err_matches!(
        t.gateway
            .module()
            .create_client(&mut t.state, env(), &unknown, &consensus_state),
        ClientError::ChecksumNotFound(_)
    );

    let zero = WasmClientState::new(client_state.data.clone(), checksum, Height::default());
    assert_err_matches!(
        t.gateway
            .module()
            .create_client(&mut t.state, env(), &zero, &consensus_state),
        ClientError::InvalidClientState(_)
    );

    let unnamed = WasmClientState::new(client_state_bytes("", h(1), TRUSTING_PERIOD), checksum, h(1));
    assert_err_matches!(
        t.gateway
            .module()
            .create_client(&mut t.state, env(), &unnamed, &consensus_state),
        ClientError::InvalidClientState(_)
    );

    let late = BlockEnv::new(10, GENESIS_TIME + TRUSTING_PERIOD + 1);
    assert_err_matches!(
        t.gateway
            .module()
            .create_client(&mut t.state, late, &client_state, &consensus_state),
        ClientError::UnexpectedStatus { status: Status::Expired, .. }
    );
    assert_eq!(t.state, before);

    assert_eq!(t.create(checksum, 1).as_str(), "08-wasm-0");
}

#[test]
fn read_only_operations_report_module_answers() {
    let mut t = Harness::new();
    let checksum = t.store(MOCK_CLIENT_V1);
    let id = t.create(checksum, 1);
    let client = t.gateway.module().client(&t.state, &id, env()).unwrap();

    assert_eq!(client.timestamp_at_height(&t.state, &h(1)).unwrap(), GENESIS_TIME);
    assert_err_matches!(
        client.timestamp_at_height(&t.state, &h(9)),
        ClientError::ConsensusStateNotFound { .. }
    );
    assert_eq!(
        client.export_metadata(&t.state).unwrap(),
        vec![GenesisMetadata {
            key: b"chainId".to_vec(),
            value: CHAIN.as_bytes().to_vec(),
        }]
    );
    assert_eq!(
        client.consensus_state(&t.state, &h(1)).unwrap().data,
        consensus_state_bytes(GENESIS_TIME, GENESIS_ROOT)
    );

    let expired = t
        .gateway
        .module()
        .client(&t.state, &id, BlockEnv::new(99, GENESIS_TIME + TRUSTING_PERIOD + 1))
        .unwrap();
    assert_eq!(expired.status(&t.state).unwrap(), Status::Expired);
}

#[test]
fn schema_mismatch_quarantines_the_checksum_until_released() {
    let mut t = Harness::new();
    let bad = t.store(MOCK_CLIENT_BAD_SCHEMA);
    let (client_state, consensus_state) = t.genesis(bad, 1);
    let before = t.state.clone();

    assert_err_matches!(
        t.gateway
            .module()
            .create_client(&mut t.state, env(), &client_state, &consensus_state),
        ClientError::Invoke(InvokeError::SchemaMismatch { .. })
    );
    let invoker = t.gateway.module().invoker();
    assert!(invoker.is_quarantined(&t.state, &bad).unwrap());
    assert_eq!(invoker.quarantined(&t.state).unwrap(), vec![bad]);
    assert!(dump_prefix(&t.state, CLIENT_STORE_PREFIX).is_empty());
    assert_err_matches!(
        t.gateway
            .module()
            .create_client(&mut t.state, env(), &client_state, &consensus_state),
        ClientError::Invoke(InvokeError::Quarantined(_))
    );

    // A host rebuilt over the same state sees the same halt.
    let restarted = WasmLightClientModule::new(Arc::new(MockLightClientVm::new()), &WasmConfig::default());
    assert_err_matches!(
        restarted.create_client(&mut t.state, env(), &client_state, &consensus_state),
        ClientError::Invoke(InvokeError::Quarantined(_))
    );

    t.gateway
        .release_checksum(&mut t.state, &bad, &t.authority)
        .unwrap();
    assert!(t.gateway.module().invoker().quarantined(&t.state).unwrap().is_empty());
    assert_eq!(t.state, before);
}

#[test]
fn upgrade_moves_the_client_to_the_upgraded_height() {
    let mut t = Harness::new();
    let checksum = t.store(MOCK_CLIENT_V1);
    let id = t.create(checksum, 1);
    let client = t.gateway.module().client(&t.state, &id, env()).unwrap();

    let upgraded_client = client_state_bytes(CHAIN, Height::new(1, 1), TRUSTING_PERIOD);
    let upgraded_consensus = consensus_state_bytes(140, b"root-upgraded");
    let (proof_client, proof_consensus) =
        upgrade_proofs(GENESIS_ROOT, &upgraded_client, &upgraded_consensus);

    let before = t.state.clone();
    let forged = UpgradeRequest {
        upgrade_client_state: upgraded_client.clone(),
        upgrade_consensus_state: upgraded_consensus.clone(),
        proof_upgrade_client: proof_consensus.clone(),
        proof_upgrade_consensus_state: proof_consensus.clone(),
    };
    assert_err_matches!(
        client.verify_upgrade_and_update_state(&mut t.state, forged),
        ClientError::InvalidProof(_)
    );
    assert_eq!(t.state, before);

    let request = UpgradeRequest {
        upgrade_client_state: upgraded_client,
        upgrade_consensus_state: upgraded_consensus,
        proof_upgrade_client: proof_client,
        proof_upgrade_consensus_state: proof_consensus,
    };
    let height = client
        .verify_upgrade_and_update_state(&mut t.state, request)
        .unwrap();
    assert_eq!(height, Height::new(1, 1));
    assert_eq!(WasmClientState::load(&t.state, &id).unwrap().latest_height, height);
    assert!(WasmConsensusState::try_load(&t.state, &id, &height).unwrap().is_some());
    assert_eq!(client.status(&t.state).unwrap(), Status::Active);
}
