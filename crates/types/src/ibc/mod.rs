// Path: crates/types/src/ibc/mod.rs
//! Core data structures for light-client identity.

use crate::error::ClientError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The client type under which all WASM-hosted light clients are registered.
pub const WASM_CLIENT_TYPE: &str = "08-wasm";

/// The content digest (SHA-256) of an uncompressed light-client module.
///
/// A checksum is the only identity by which chain state references a module.
/// It is rendered as lowercase hex in JSON and logs and as raw bytes in SCALE.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(#[serde(with = "hex::serde")] [u8; 32]);

impl Checksum {
    /// Length of a checksum in bytes.
    pub const LEN: usize = 32;

    /// Wraps a raw 32-byte digest.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parses a checksum from a byte slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    /// Returns the lowercase hex encoding of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

impl FromStr for Checksum {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut out)?;
        Ok(Self(out))
    }
}

/// A height on the counterparty chain, ordered by revision number then revision height.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct Height {
    /// The revision (fork epoch) of the counterparty chain.
    pub revision_number: u64,
    /// The block height within the revision.
    pub revision_height: u64,
}

impl Height {
    /// Creates a new height.
    pub const fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    /// Returns true for the zero height, which never identifies a consensus state.
    pub fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

/// A host-assigned light-client instance identifier, e.g. `08-wasm-3`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Minimum identifier length for client identifiers.
    pub const MIN_LEN: usize = 9;
    /// Maximum identifier length for client identifiers.
    pub const MAX_LEN: usize = 64;

    /// Builds the identifier `<client_type>-<sequence>`.
    pub fn new(client_type: &str, sequence: u64) -> Result<Self, ClientError> {
        Self::from_str(&format!("{}-{}", client_type, sequence))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the client type portion of the identifier.
    pub fn client_type(&self) -> &str {
        self.0.rsplit_once('-').map(|(t, _)| t).unwrap_or_default()
    }

    /// Returns the host-assigned sequence portion of the identifier.
    pub fn sequence(&self) -> u64 {
        self.0
            .rsplit_once('-')
            .and_then(|(_, s)| s.parse().ok())
            .unwrap_or_default()
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-' | '#' | '[' | ']' | '<' | '>')
}

impl FromStr for ClientId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ClientError::InvalidClientId(format!("{}: {}", s, reason));
        if s.len() < Self::MIN_LEN || s.len() > Self::MAX_LEN {
            return Err(invalid("length out of range"));
        }
        if !s.chars().all(is_identifier_char) {
            return Err(invalid("contains characters outside the identifier set"));
        }
        match s.rsplit_once('-') {
            Some((client_type, seq))
                if !client_type.is_empty() && !seq.is_empty() && seq.parse::<u64>().is_ok() =>
            {
                Ok(Self(s.to_string()))
            }
            _ => Err(invalid("expected <client-type>-<sequence>")),
        }
    }
}

impl TryFrom<String> for ClientId {
    type Error = ClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The lifecycle status of a light-client instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize)]
pub enum Status {
    /// The client accepts updates and proof verification.
    Active,
    /// The trusting period elapsed; only substitute recovery can reactivate it.
    Expired,
    /// Misbehaviour was detected; only substitute recovery can reactivate it.
    Frozen,
    /// The client does not exist or its status could not be determined.
    Unknown,
}

impl Status {
    /// Returns true if the client may be updated or used for proof verification.
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Active => "Active",
            Status::Expired => "Expired",
            Status::Frozen => "Frozen",
            Status::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_accepts_host_format() {
        let id = ClientId::new(WASM_CLIENT_TYPE, 3).unwrap();
        assert_eq!(id.as_str(), "08-wasm-3");
        assert_eq!(id.client_type(), "08-wasm");
        assert_eq!(id.sequence(), 3);
    }

    #[test]
    fn client_id_rejects_malformed_identifiers() {
        for bad in ["x-0", "08-wasm-", "08-wasm-abc", "08-wasm/1-0", "no_sequence_here"] {
            assert!(ClientId::from_str(bad).is_err(), "{} should be rejected", bad);
        }
        assert!(ClientId::from_str(&format!("{}-1", "a".repeat(70))).is_err());
    }

    #[test]
    fn client_id_serde_validates() {
        let ok: ClientId = serde_json::from_str("\"07-tendermint-0\"").unwrap();
        assert_eq!(ok.client_type(), "07-tendermint");
        assert!(serde_json::from_str::<ClientId>("\"bad/id-0\"").is_err());
    }

    #[test]
    fn checksum_hex_roundtrip_through_json() {
        let checksum = Checksum::new([0xab; 32]);
        let json = serde_json::to_string(&checksum).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let parsed: Checksum = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, checksum);
        assert_eq!(Checksum::from_str(&format!("0x{}", "ab".repeat(32))).unwrap(), checksum);
    }

    #[test]
    fn heights_order_by_revision_first() {
        assert!(Height::new(1, 1) > Height::new(0, 1000));
        assert!(Height::new(1, 2) > Height::new(1, 1));
        assert_eq!(Height::new(2, 17).to_string(), "2-17");
        assert!(Height::default().is_zero());
    }
}
