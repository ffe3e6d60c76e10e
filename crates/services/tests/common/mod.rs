// Path: crates/services/tests/common/mod.rs
#![allow(dead_code)]

use ioi_lc_api::state::MemoryStore;
use ioi_lc_services::governance::WasmGovernanceGateway;
use ioi_lc_services::ibc::light_clients::wasm::{
    WasmClientState, WasmConsensusState, WasmLightClientModule,
};
use ioi_lc_test_utils::mock_client::{client_state_bytes, consensus_state_bytes, header_bytes};
use ioi_lc_test_utils::MockLightClientVm;
use ioi_lc_types::app::{Authority, BlockEnv};
use ioi_lc_types::config::WasmConfig;
use ioi_lc_types::ibc::{Checksum, ClientId, Height};
use std::sync::Arc;

pub const CHAIN: &str = "chain-a";
pub const GENESIS_ROOT: &[u8] = b"root-1";
pub const GENESIS_TIME: u64 = 100;
pub const TRUSTING_PERIOD: u64 = 1_000;

/// A block environment inside every client's trusting period.
pub fn env() -> BlockEnv {
    BlockEnv::new(10, 150)
}

pub fn h(revision_height: u64) -> Height {
    Height::new(0, revision_height)
}

/// A header for `CHAIN` at `height` committing to `root`.
pub fn valid_header(height: u64, root: &[u8]) -> Vec<u8> {
    header_bytes(CHAIN, h(height), GENESIS_TIME + height, root)
}

pub struct Harness {
    pub state: MemoryStore,
    pub gateway: WasmGovernanceGateway,
    pub authority: Authority,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(WasmConfig::default())
    }

    pub fn with_config(config: WasmConfig) -> Self {
        let module = WasmLightClientModule::new(Arc::new(MockLightClientVm::new()), &config);
        Self {
            state: MemoryStore::new(),
            gateway: WasmGovernanceGateway::new(Arc::new(module), &config),
            authority: Authority::new(config.authority),
        }
    }

    pub fn store(&mut self, code: &[u8]) -> Checksum {
        self.gateway
            .store_code(&mut self.state, code, &self.authority)
            .unwrap()
    }

    pub fn genesis(&self, checksum: Checksum, height: u64) -> (WasmClientState, WasmConsensusState) {
        (
            WasmClientState::new(
                client_state_bytes(CHAIN, h(height), TRUSTING_PERIOD),
                checksum,
                h(height),
            ),
            WasmConsensusState::new(consensus_state_bytes(GENESIS_TIME, GENESIS_ROOT)),
        )
    }

    /// Creates an active client on `checksum` whose latest height is `height`.
    pub fn create(&mut self, checksum: Checksum, height: u64) -> ClientId {
        let (client_state, consensus_state) = self.genesis(checksum, height);
        self.gateway
            .module()
            .create_client(&mut self.state, env(), &client_state, &consensus_state)
            .unwrap()
    }
}
