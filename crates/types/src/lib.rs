//! Wire-format types for the Cambrian price oracle payload.
//!
//! These are the shapes exchanged with the outside world: the request
//! object handed to the payload, the normalized price observation, and the
//! proposal document emitted on completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;

/// Default Cambrian AVS public key.
pub const DEFAULT_AVS_PUBLIC_KEY: &str = "57wMKYdCPiA8tn28t2ucZkxEz9Lvd9eMLDLXf5kJzR1h";

/// Default payload image name.
pub const DEFAULT_PAYLOAD_IMAGE: &str = "payload-check-oracle";

/// Default proof-of-authority name.
pub const DEFAULT_POA_NAME: &str = "default";

/// Default proposal storage key.
pub const DEFAULT_PROPOSAL_STORAGE_KEY: &str = "price_oracle";

/// A normalized price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Price in USD
    pub price: f64,

    /// Unix timestamp in seconds
    pub timestamp: i64,

    /// 24h change in percent
    #[serde(default)]
    pub change_24h: f64,

    /// Number of sources aggregated into the price
    #[serde(default = "default_sources_count")]
    pub sources_count: u32,

    /// Confidence in the price (0.0 to 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_sources_count() -> u32 {
    1
}

fn default_confidence() -> f64 {
    1.0
}

impl PriceObservation {
    /// Observation from a single source with full confidence.
    pub fn new(price: f64, timestamp: i64, change_24h: f64) -> Self {
        Self {
            price,
            timestamp,
            change_24h,
            sources_count: default_sources_count(),
            confidence: default_confidence(),
        }
    }

    /// Wall-clock time of the observation, if the timestamp is representable.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Access role of an account referenced by an instruction.
///
/// Serialized as the numeric role used by Solana account metas
/// (`0` readonly, `1` writable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRole {
    Readonly,
    Writable,
}

impl AccountRole {
    pub fn as_u8(self) -> u8 {
        match self {
            AccountRole::Readonly => 0,
            AccountRole::Writable => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AccountRole::Readonly),
            1 => Some(AccountRole::Writable),
            _ => None,
        }
    }
}

impl Serialize for AccountRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for AccountRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        AccountRole::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported account role {value}")))
    }
}

/// An account referenced by an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReference {
    #[serde(with = "base58")]
    pub address: Pubkey,
    pub role: AccountRole,
}

impl AccountReference {
    pub fn writable(address: Pubkey) -> Self {
        Self {
            address,
            role: AccountRole::Writable,
        }
    }

    pub fn readonly(address: Pubkey) -> Self {
        Self {
            address,
            role: AccountRole::Readonly,
        }
    }
}

/// An encoded proposal instruction for the price oracle program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionPayload {
    #[serde(with = "base58")]
    pub program_address: Pubkey,

    pub accounts: Vec<AccountReference>,

    /// Instruction data, emitted as an array of byte values
    pub data: Vec<u8>,
}

impl From<&InstructionPayload> for Instruction {
    fn from(payload: &InstructionPayload) -> Self {
        let accounts = payload
            .accounts
            .iter()
            .map(|account| match account.role {
                AccountRole::Writable => AccountMeta::new(account.address, false),
                AccountRole::Readonly => AccountMeta::new_readonly(account.address, false),
            })
            .collect();

        Instruction {
            program_id: payload.program_address,
            accounts,
            data: payload.data.clone(),
        }
    }
}

/// Document emitted on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDocument {
    pub proposal_instructions: Vec<InstructionPayload>,
}

impl ProposalDocument {
    pub fn single(instruction: InstructionPayload) -> Self {
        Self {
            proposal_instructions: vec![instruction],
        }
    }
}

/// Document emitted on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub error: String,
}

impl ErrorDocument {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Request parameters for a payload run.
///
/// Every field is optional on the wire; a missing, `null` or empty value
/// takes the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawOracleRequest")]
pub struct OracleRequest {
    pub avs_public_key: String,
    pub payload_image: String,
    pub poa_name: String,
    pub proposal_storage_key: String,
}

impl Default for OracleRequest {
    fn default() -> Self {
        Self {
            avs_public_key: DEFAULT_AVS_PUBLIC_KEY.to_string(),
            payload_image: DEFAULT_PAYLOAD_IMAGE.to_string(),
            poa_name: DEFAULT_POA_NAME.to_string(),
            proposal_storage_key: DEFAULT_PROPOSAL_STORAGE_KEY.to_string(),
        }
    }
}

/// Request as received, before defaults are applied.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOracleRequest {
    #[serde(default)]
    avs_public_key: Option<String>,
    #[serde(default)]
    payload_image: Option<String>,
    #[serde(default)]
    poa_name: Option<String>,
    #[serde(default)]
    proposal_storage_key: Option<String>,
}

impl From<RawOracleRequest> for OracleRequest {
    fn from(raw: RawOracleRequest) -> Self {
        fn or_default(value: Option<String>, default: &str) -> String {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        }

        Self {
            avs_public_key: or_default(raw.avs_public_key, DEFAULT_AVS_PUBLIC_KEY),
            payload_image: or_default(raw.payload_image, DEFAULT_PAYLOAD_IMAGE),
            poa_name: or_default(raw.poa_name, DEFAULT_POA_NAME),
            proposal_storage_key: or_default(
                raw.proposal_storage_key,
                DEFAULT_PROPOSAL_STORAGE_KEY,
            ),
        }
    }
}

/// Serde adapter for base58 account addresses.
mod base58 {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};
    use solana_program::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(pubkey: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(pubkey)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Pubkey::from_str(&encoded).map_err(serde::de::Error::custom)
    }
}
