// Path: crates/services/src/ibc/light_clients/wasm/consensus_state.rs

//! The host-visible view of a tracked consensus state.

use ioi_lc_api::state::{ClientStore, StateAccess};
use ioi_lc_types::error::ClientError;
use ioi_lc_types::ibc::{ClientId, Height};
use ioi_lc_types::keys::{consensus_state_key, CONSENSUS_STATE_PREFIX};

/// An opaque consensus snapshot, stored at `consensusStates/<revision>-<height>`
/// inside the client namespace. The host indexes it by height and never
/// interprets `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmConsensusState {
    pub data: Vec<u8>,
}

impl WasmConsensusState {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Loads the consensus state of `client_id` at `height`, if one is tracked.
    pub fn try_load(
        state: &dyn StateAccess,
        client_id: &ClientId,
        height: &Height,
    ) -> Result<Option<Self>, ClientError> {
        let store = ClientStore::read_only(state, client_id);
        Ok(store.get(&consensus_state_key(height))?.map(Self::new))
    }

    /// Loads the consensus state of `client_id` at `height`.
    pub fn load(state: &dyn StateAccess, client_id: &ClientId, height: &Height) -> Result<Self, ClientError> {
        Self::try_load(state, client_id, height)?.ok_or_else(|| ClientError::ConsensusStateNotFound {
            client_id: client_id.clone(),
            height: *height,
        })
    }

    pub(crate) fn store(
        &self,
        state: &mut dyn StateAccess,
        client_id: &ClientId,
        height: &Height,
    ) -> Result<(), ClientError> {
        ClientStore::host(state, client_id).insert(&consensus_state_key(height), &self.data)?;
        Ok(())
    }

    /// Every height with a tracked consensus state, in ascending order.
    pub fn heights(state: &dyn StateAccess, client_id: &ClientId) -> Result<Vec<Height>, ClientError> {
        let store = ClientStore::read_only(state, client_id);
        let mut heights = Vec::new();
        for item in store.prefix_scan(CONSENSUS_STATE_PREFIX)? {
            let (key, _) = item?;
            if let Some(height) = key
                .get(CONSENSUS_STATE_PREFIX.len()..)
                .and_then(|suffix| std::str::from_utf8(suffix).ok())
                .and_then(parse_height)
            {
                heights.push(height);
            }
        }
        // Keys sort lexically ("0-10" < "0-9"), heights numerically.
        heights.sort();
        Ok(heights)
    }
}

fn parse_height(s: &str) -> Option<Height> {
    let (revision, height) = s.split_once('-')?;
    Some(Height::new(revision.parse().ok()?, height.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioi_lc_api::state::MemoryStore;
    use std::str::FromStr;

    #[test]
    fn heights_are_numerically_ordered() {
        let id = ClientId::from_str("08-wasm-0").unwrap();
        let mut state = MemoryStore::new();
        for h in [10, 9, 100] {
            WasmConsensusState::new(vec![h as u8])
                .store(&mut state, &id, &Height::new(0, h))
                .unwrap();
        }
        assert_eq!(
            WasmConsensusState::heights(&state, &id).unwrap(),
            vec![Height::new(0, 9), Height::new(0, 10), Height::new(0, 100)]
        );
        assert_eq!(
            WasmConsensusState::load(&state, &id, &Height::new(0, 9)).unwrap().data,
            vec![9]
        );
    }

    #[test]
    fn missing_height_is_not_found() {
        let id = ClientId::from_str("08-wasm-0").unwrap();
        let err = WasmConsensusState::load(&MemoryStore::new(), &id, &Height::new(0, 1)).unwrap_err();
        assert!(err.is_not_found());
    }
}
