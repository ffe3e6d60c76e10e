// Path: crates/test_utils/src/mock_client/mod.rs
//! A native light-client "module" that speaks the JSON call ABI.
//!
//! [`MockLightClientVm`] implements `VirtualMachine` without an engine: the
//! module bytes select a behaviour flavour and every call is interpreted in
//! Rust against the namespaced store it is handed. The consensus it verifies is
//! deliberately trivial:
//!
//! - a header is authentic iff `signed_by` equals the client's `chain_id`,
//! - misbehaviour is two authentic headers at one height with different roots,
//! - a membership proof is `sha256(root || path || value)` and a non-membership
//!   proof is `sha256(root || path)`,
//! - a client expires when `block_time > timestamp + trusting_period` of the
//!   consensus state at its latest height.

use ioi_lc_api::state::StateAccess;
use ioi_lc_api::vm::{EntryPoint, ExecutionContext, ExecutionOutput, VirtualMachine};
use ioi_lc_crypto::algorithms::hash::sha256_concat;
use ioi_lc_types::error::{StateError, VmError};
use ioi_lc_types::ibc::{Checksum, ClientId, Height};
use ioi_lc_types::keys::client_store_prefix;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A well-behaved module.
pub const MOCK_CLIENT_V1: &[u8] = b"mock-lc:v1";
/// The same light client, version 2. Migrating to it stamps `version = 2`.
pub const MOCK_CLIENT_V2: &[u8] = b"mock-lc:v2";
/// Answers every call with `{"ok": {"unexpected": true}}`.
pub const MOCK_CLIENT_BAD_SCHEMA: &[u8] = b"mock-lc:bad-schema";
/// Writes a marker key and then traps on every call.
pub const MOCK_CLIENT_TRAP: &[u8] = b"mock-lc:trap";
/// Behaves like v1, except that `migrate_client_store` scribbles over the
/// client state and then traps.
pub const MOCK_CLIENT_BROKEN_MIGRATION: &[u8] = b"mock-lc:broken-migration";

/// Key written by [`MOCK_CLIENT_TRAP`] before it traps.
pub const TRAP_MARKER_KEY: &[u8] = b"trap/marker";

const CLIENT_STATE: &str = "clientState";
const CONSENSUS_STATES: &str = "consensusStates/";
const SUBJECT: &str = "subject/";
const SUBSTITUTE: &str = "substitute/";

const BASE_GAS: u64 = 1_000;
const READ_GAS: u64 = 100;
const WRITE_GAS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavour {
    V1,
    V2,
    BadSchema,
    Trap,
    BrokenMigration,
}

impl Flavour {
    fn parse(code: &[u8]) -> Result<Self, VmError> {
        match code {
            MOCK_CLIENT_V1 => Ok(Self::V1),
            MOCK_CLIENT_V2 => Ok(Self::V2),
            MOCK_CLIENT_BAD_SCHEMA => Ok(Self::BadSchema),
            MOCK_CLIENT_TRAP => Ok(Self::Trap),
            MOCK_CLIENT_BROKEN_MIGRATION => Ok(Self::BrokenMigration),
            _ => Err(VmError::InvalidBytecode(
                "not a mock light-client module".into(),
            )),
        }
    }

    fn version(self) -> u32 {
        match self {
            Self::V2 => 2,
            Self::BrokenMigration => 3,
            _ => 1,
        }
    }
}

/// The client state the mock module keeps under `clientState`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MockClientState {
    pub chain_id: String,
    pub latest_height: Height,
    pub trusting_period: u64,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub version: u32,
}

/// The consensus state the mock module keeps under `consensusStates/<height>`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MockConsensusState {
    pub timestamp: u64,
    #[serde(with = "hex::serde")]
    pub root: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MockHeader {
    pub signed_by: String,
    pub height: Height,
    pub timestamp: u64,
    #[serde(with = "hex::serde")]
    pub root: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MockClientMessage {
    Header(MockHeader),
    Misbehaviour {
        header_1: MockHeader,
        header_2: MockHeader,
    },
}

/// Encoded initial client state.
pub fn client_state_bytes(chain_id: &str, latest_height: Height, trusting_period: u64) -> Vec<u8> {
    to_json(&MockClientState {
        chain_id: chain_id.to_string(),
        latest_height,
        trusting_period,
        frozen: false,
        version: 0,
    })
}

/// Encoded consensus state.
pub fn consensus_state_bytes(timestamp: u64, root: &[u8]) -> Vec<u8> {
    to_json(&MockConsensusState {
        timestamp,
        root: root.to_vec(),
    })
}

pub fn header(signed_by: &str, height: Height, timestamp: u64, root: &[u8]) -> MockHeader {
    MockHeader {
        signed_by: signed_by.to_string(),
        height,
        timestamp,
        root: root.to_vec(),
    }
}

/// Encoded header client message.
pub fn header_bytes(signed_by: &str, height: Height, timestamp: u64, root: &[u8]) -> Vec<u8> {
    to_json(&MockClientMessage::Header(header(
        signed_by, height, timestamp, root,
    )))
}

/// Encoded misbehaviour client message.
pub fn misbehaviour_bytes(header_1: MockHeader, header_2: MockHeader) -> Vec<u8> {
    to_json(&MockClientMessage::Misbehaviour { header_1, header_2 })
}

pub fn membership_proof(root: &[u8], path: &[u8], value: &[u8]) -> Vec<u8> {
    sha256_concat(&[root, path, value]).to_vec()
}

pub fn non_membership_proof(root: &[u8], path: &[u8]) -> Vec<u8> {
    sha256_concat(&[root, path]).to_vec()
}

/// Proofs that `root` committed to the upgraded client and consensus states.
pub fn upgrade_proofs(root: &[u8], client_state: &[u8], consensus_state: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (
        sha256_concat(&[root, b"upgradedClient", client_state]).to_vec(),
        sha256_concat(&[root, b"upgradedConsState", consensus_state]).to_vec(),
    )
}

/// Reads the module-owned client state of `client_id` from the host's root store.
pub fn read_client_state(state: &dyn StateAccess, client_id: &ClientId) -> Option<MockClientState> {
    let key = [client_store_prefix(client_id).as_slice(), CLIENT_STATE.as_bytes()].concat();
    let raw = state.get(&key).ok()??;
    serde_json::from_slice(&raw).ok()
}

fn to_json<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn consensus_key(height: &Height) -> String {
    format!("{}{}", CONSENSUS_STATES, height)
}

/// A `VirtualMachine` interpreting the mock modules natively.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockLightClientVm;

impl MockLightClientVm {
    pub fn new() -> Self {
        Self
    }
}

type Outcome = Result<Value, String>;

struct Call<'s> {
    store: &'s mut dyn StateAccess,
    block_time: u64,
    gas_limit: u64,
    gas_used: u64,
    flavour: Flavour,
}

fn store_fault(e: StateError) -> VmError {
    match e {
        StateError::Backend(_) | StateError::WriteError(_) | StateError::Decode(_) => {
            VmError::HostError(e.to_string())
        }
        other => VmError::ExecutionTrap(format!("store access rejected: {}", other)),
    }
}

fn field<T: for<'de> Deserialize<'de>>(msg: &Value, name: &str) -> Result<T, VmError> {
    serde_json::from_value(msg.get(name).cloned().unwrap_or(Value::Null))
        .map_err(|e| VmError::ExecutionTrap(format!("malformed field '{}': {}", name, e)))
}

fn hex_field(msg: &Value, name: &str) -> Result<Vec<u8>, VmError> {
    let raw: String = field(msg, name)?;
    hex::decode(raw).map_err(|e| VmError::ExecutionTrap(format!("field '{}' is not hex: {}", name, e)))
}

impl<'s> Call<'s> {
    fn charge(&mut self, cost: u64) -> Result<(), VmError> {
        self.gas_used = self.gas_used.saturating_add(cost);
        if self.gas_used > self.gas_limit {
            self.gas_used = self.gas_limit;
            return Err(VmError::OutOfGas);
        }
        Ok(())
    }

    fn read(&mut self, key: &str) -> Result<Option<Vec<u8>>, VmError> {
        self.charge(READ_GAS + key.len() as u64)?;
        self.store.get(key.as_bytes()).map_err(store_fault)
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), VmError> {
        self.charge(WRITE_GAS + (key.len() + value.len()) as u64)?;
        self.store.insert(key.as_bytes(), value).map_err(store_fault)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&mut self, key: &str) -> Result<Option<T>, VmError> {
        match self.read(key)? {
            Some(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| VmError::ExecutionTrap(format!("corrupt '{}': {}", key, e))),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), VmError> {
        let raw = serde_json::to_vec(value).map_err(|e| VmError::ExecutionTrap(e.to_string()))?;
        self.write(key, &raw)
    }

    fn client_state(&mut self, prefix: &str) -> Result<Result<MockClientState, String>, VmError> {
        Ok(self
            .read_json(&format!("{}{}", prefix, CLIENT_STATE))?
            .ok_or_else(|| "client state not found".to_string()))
    }

    fn consensus_state(&mut self, height: &Height) -> Result<Result<MockConsensusState, String>, VmError> {
        Ok(self
            .read_json(&consensus_key(height))?
            .ok_or_else(|| format!("consensus state not found at height {}", height)))
    }

    fn dispatch(&mut self, kind: &str, msg: &Value) -> Result<Outcome, VmError> {
        match kind {
            "instantiate" => self.instantiate(msg),
            "status" => self.status(),
            "verify_client_message" => self.verify_client_message(msg),
            "check_for_misbehaviour" => self.check_for_misbehaviour(msg),
            "update_state" => self.update_state(msg),
            "update_state_on_misbehaviour" => self.update_state_on_misbehaviour(),
            "verify_membership" => self.verify_membership(msg, true),
            "verify_non_membership" => self.verify_membership(msg, false),
            "timestamp_at_height" => self.timestamp_at_height(msg),
            "export_metadata" => self.export_metadata(),
            "check_substitute_and_update_state" => self.check_substitute(),
            "verify_upgrade_and_update_state" => self.verify_upgrade(msg),
            "migrate_client_store" => self.migrate(),
            other => Ok(Err(format!("unsupported message '{}'", other))),
        }
    }

    fn instantiate(&mut self, msg: &Value) -> Result<Outcome, VmError> {
        let raw_client = hex_field(msg, "client_state")?;
        let raw_consensus = hex_field(msg, "consensus_state")?;
        let Ok(mut client) = serde_json::from_slice::<MockClientState>(&raw_client) else {
            return Ok(Err("undecodable client state".into()));
        };
        let Ok(consensus) = serde_json::from_slice::<MockConsensusState>(&raw_consensus) else {
            return Ok(Err("undecodable consensus state".into()));
        };
        if client.chain_id.is_empty() {
            return Ok(Err("chain id must not be empty".into()));
        }
        client.version = self.flavour.version();
        client.frozen = false;
        self.write_json(CLIENT_STATE, &client)?;
        self.write_json(&consensus_key(&client.latest_height), &consensus)?;
        Ok(Ok(json!({})))
    }

    fn status(&mut self) -> Result<Outcome, VmError> {
        let client = match self.client_state("")? {
            Ok(client) => client,
            Err(_) => return Ok(Ok(json!({ "status": "Unknown" }))),
        };
        if client.frozen {
            return Ok(Ok(json!({ "status": "Frozen" })));
        }
        let status = match self.consensus_state(&client.latest_height)? {
            Err(_) => "Unknown",
            Ok(cs) if self.block_time > cs.timestamp.saturating_add(client.trusting_period) => {
                "Expired"
            }
            Ok(_) => "Active",
        };
        Ok(Ok(json!({ "status": status })))
    }

    fn client_message(msg: &Value) -> Result<Result<MockClientMessage, String>, VmError> {
        let raw = hex_field(msg, "client_message")?;
        Ok(serde_json::from_slice(&raw).map_err(|e| format!("undecodable client message: {}", e)))
    }

    fn check_header(client: &MockClientState, header: &MockHeader) -> Result<(), String> {
        if header.signed_by != client.chain_id {
            return Err(format!(
                "header is not signed by chain {}",
                client.chain_id
            ));
        }
        if header.height.is_zero() {
            return Err("header height must be non-zero".into());
        }
        Ok(())
    }

    fn verify_client_message(&mut self, msg: &Value) -> Result<Outcome, VmError> {
        let message = match Self::client_message(msg)? {
            Ok(m) => m,
            Err(e) => return Ok(Err(e)),
        };
        let client = match self.client_state("")? {
            Ok(c) => c,
            Err(e) => return Ok(Err(e)),
        };
        let verdict = match &message {
            MockClientMessage::Header(h) => Self::check_header(&client, h),
            MockClientMessage::Misbehaviour { header_1, header_2 } => {
                Self::check_header(&client, header_1)
                    .and_then(|_| Self::check_header(&client, header_2))
                    .and_then(|_| {
                        if header_1.height == header_2.height {
                            Ok(())
                        } else {
                            Err("misbehaviour headers must share a height".into())
                        }
                    })
            }
        };
        Ok(verdict.map(|_| json!({})))
    }

    fn check_for_misbehaviour(&mut self, msg: &Value) -> Result<Outcome, VmError> {
        let message = match Self::client_message(msg)? {
            Ok(m) => m,
            Err(e) => return Ok(Err(e)),
        };
        let found = match message {
            MockClientMessage::Header(h) => match self.consensus_state(&h.height)? {
                Ok(existing) => existing.root != h.root,
                Err(_) => false,
            },
            MockClientMessage::Misbehaviour { header_1, header_2 } => header_1.root != header_2.root,
        };
        Ok(Ok(json!({ "found_misbehaviour": found })))
    }

    fn update_state(&mut self, msg: &Value) -> Result<Outcome, VmError> {
        let header = match Self::client_message(msg)? {
            Ok(MockClientMessage::Header(h)) => h,
            Ok(MockClientMessage::Misbehaviour { .. }) => {
                return Ok(Err("cannot update state with misbehaviour".into()))
            }
            Err(e) => return Ok(Err(e)),
        };
        let mut client = match self.client_state("")? {
            Ok(c) => c,
            Err(e) => return Ok(Err(e)),
        };
        let consensus = MockConsensusState {
            timestamp: header.timestamp,
            root: header.root,
        };
        self.write_json(&consensus_key(&header.height), &consensus)?;
        if header.height > client.latest_height {
            client.latest_height = header.height;
            self.write_json(CLIENT_STATE, &client)?;
        }
        Ok(Ok(json!({ "heights": [header.height] })))
    }

    fn update_state_on_misbehaviour(&mut self) -> Result<Outcome, VmError> {
        let mut client = match self.client_state("")? {
            Ok(c) => c,
            Err(e) => return Ok(Err(e)),
        };
        client.frozen = true;
        self.write_json(CLIENT_STATE, &client)?;
        Ok(Ok(json!({})))
    }

    fn verify_membership(&mut self, msg: &Value, membership: bool) -> Result<Outcome, VmError> {
        let height: Height = field(msg, "height")?;
        let proof = hex_field(msg, "proof")?;
        let path = hex_field(msg, "path")?;
        let consensus = match self.consensus_state(&height)? {
            Ok(cs) => cs,
            Err(e) => return Ok(Err(e)),
        };
        let expected = if membership {
            let value = hex_field(msg, "value")?;
            membership_proof(&consensus.root, &path, &value)
        } else {
            non_membership_proof(&consensus.root, &path)
        };
        if proof != expected {
            return Ok(Err("proof does not verify against the consensus root".into()));
        }
        Ok(Ok(json!({})))
    }

    fn timestamp_at_height(&mut self, msg: &Value) -> Result<Outcome, VmError> {
        let height: Height = field(msg, "height")?;
        Ok(self
            .consensus_state(&height)?
            .map(|cs| json!({ "timestamp": cs.timestamp })))
    }

    fn export_metadata(&mut self) -> Result<Outcome, VmError> {
        let client = match self.client_state("")? {
            Ok(c) => c,
            Err(e) => return Ok(Err(e)),
        };
        Ok(Ok(json!({
            "genesis_metadata": [
                { "key": hex::encode("chainId"), "value": hex::encode(&client.chain_id) },
            ]
        })))
    }

    fn check_substitute(&mut self) -> Result<Outcome, VmError> {
        let subject = match self.client_state(SUBJECT)? {
            Ok(c) => c,
            Err(e) => return Ok(Err(format!("subject: {}", e))),
        };
        let substitute = match self.client_state(SUBSTITUTE)? {
            Ok(c) => c,
            Err(e) => return Ok(Err(format!("substitute: {}", e))),
        };
        if subject.chain_id != substitute.chain_id {
            return Ok(Err("substitute tracks a different chain".into()));
        }

        let scan_prefix = format!("{}{}", SUBSTITUTE, CONSENSUS_STATES);
        self.charge(READ_GAS + scan_prefix.len() as u64)?;
        let entries: Vec<(Vec<u8>, Vec<u8>)> = self
            .store
            .prefix_scan(scan_prefix.as_bytes())
            .map_err(store_fault)?
            .map(|item| item.map(|(k, v)| (k.to_vec(), v.to_vec())))
            .collect::<Result<_, _>>()
            .map_err(store_fault)?;
        for (key, value) in entries {
            let relative = String::from_utf8_lossy(key.get(SUBSTITUTE.len()..).unwrap_or_default())
                .into_owned();
            self.write(&format!("{}{}", SUBJECT, relative), &value)?;
        }

        let recovered = MockClientState {
            frozen: false,
            version: subject.version,
            ..substitute
        };
        self.write_json(&format!("{}{}", SUBJECT, CLIENT_STATE), &recovered)?;
        Ok(Ok(json!({})))
    }

    fn verify_upgrade(&mut self, msg: &Value) -> Result<Outcome, VmError> {
        let raw_client = hex_field(msg, "upgrade_client_state")?;
        let raw_consensus = hex_field(msg, "upgrade_consensus_state")?;
        let proof_client = hex_field(msg, "proof_upgrade_client")?;
        let proof_consensus = hex_field(msg, "proof_upgrade_consensus_state")?;

        let current = match self.client_state("")? {
            Ok(c) => c,
            Err(e) => return Ok(Err(e)),
        };
        let root = match self.consensus_state(&current.latest_height)? {
            Ok(cs) => cs.root,
            Err(e) => return Ok(Err(e)),
        };
        let (expected_client, expected_consensus) = upgrade_proofs(&root, &raw_client, &raw_consensus);
        if proof_client != expected_client || proof_consensus != expected_consensus {
            return Ok(Err("upgrade proofs do not verify".into()));
        }
        let (Ok(upgraded), Ok(consensus)) = (
            serde_json::from_slice::<MockClientState>(&raw_client),
            serde_json::from_slice::<MockConsensusState>(&raw_consensus),
        ) else {
            return Ok(Err("undecodable upgrade payload".into()));
        };
        if upgraded.latest_height <= current.latest_height {
            return Ok(Err("upgraded height must be greater than the current height".into()));
        }
        let upgraded = MockClientState {
            frozen: false,
            version: current.version,
            ..upgraded
        };
        self.write_json(CLIENT_STATE, &upgraded)?;
        self.write_json(&consensus_key(&upgraded.latest_height), &consensus)?;
        Ok(Ok(json!({ "latest_height": upgraded.latest_height })))
    }

    fn migrate(&mut self) -> Result<Outcome, VmError> {
        if self.flavour == Flavour::BrokenMigration {
            self.write(CLIENT_STATE, b"half-migrated")?;
            return Err(VmError::ExecutionTrap("migration panicked".into()));
        }
        let mut client = match self.client_state("")? {
            Ok(c) => c,
            Err(e) => return Ok(Err(e)),
        };
        client.version = self.flavour.version();
        self.write_json(CLIENT_STATE, &client)?;
        Ok(Ok(json!({})))
    }
}

impl VirtualMachine for MockLightClientVm {
    fn validate(&self, code: &[u8]) -> Result<(), VmError> {
        Flavour::parse(code).map(|_| ())
    }

    fn execute(
        &self,
        _checksum: &Checksum,
        code: &[u8],
        _entry_point: EntryPoint,
        input: &[u8],
        store: &mut dyn StateAccess,
        context: ExecutionContext,
    ) -> Result<ExecutionOutput, VmError> {
        let flavour = Flavour::parse(code)?;
        let mut call = Call {
            store,
            block_time: 0,
            gas_limit: context.gas_limit,
            gas_used: 0,
            flavour,
        };
        call.charge(BASE_GAS + input.len() as u64)?;

        let envelope: Value = serde_json::from_slice(input)
            .map_err(|e| VmError::ExecutionTrap(format!("undecodable input: {}", e)))?;
        call.block_time = envelope
            .pointer("/env/block_time")
            .and_then(Value::as_u64)
            .unwrap_or_default();
        let (kind, msg) = envelope
            .get("msg")
            .and_then(Value::as_object)
            .and_then(|m| m.iter().next())
            .map(|(k, v)| (k.clone(), v.clone()))
            .ok_or_else(|| VmError::ExecutionTrap("missing message".into()))?;

        let response = match flavour {
            Flavour::BadSchema => json!({ "ok": { "unexpected": true } }),
            Flavour::Trap => {
                call.write(
                    &String::from_utf8_lossy(TRAP_MARKER_KEY),
                    kind.as_bytes(),
                )?;
                return Err(VmError::ExecutionTrap("unreachable".into()));
            }
            _ => match call.dispatch(&kind, &msg)? {
                Ok(result) => json!({ "ok": result }),
                Err(reason) => json!({ "error": reason }),
            },
        };

        let return_data =
            serde_json::to_vec(&response).map_err(|e| VmError::ExecutionTrap(e.to_string()))?;
        Ok(ExecutionOutput {
            gas_used: call.gas_used,
            return_data,
        })
    }
}
