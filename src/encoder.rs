//! Instruction payload encoding for the price oracle program.
//!
//! Instruction data is the UTF-8 text of a small JSON object:
//!
//! ```text
//! {"command":"store_sol_price","price":150.25,"timestamp":1700000000,"change_24h":2.5}
//! ```

use serde::{Deserialize, Serialize, Serializer};
use solana_program::pubkey::Pubkey;
use solana_program::sysvar;

use crate::error::OracleError;
use crate::pda::ProposalAddresses;
use crate::types::{AccountReference, InstructionPayload, PriceObservation};

/// On-chain program that stores the price.
pub const PRICE_ORACLE_PROGRAM_ID: Pubkey =
    solana_program::pubkey!("ECb6jyKXDTE8NjVjsKgNpjSjcv4h2E7JQ42yKqWihBQE");

/// Command understood by the price oracle program.
pub const STORE_PRICE_COMMAND: &str = "store_sol_price";

/// Largest magnitude up to which every integer is exactly representable in an f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Instruction data as sent. Field order is the emitted key order.
#[derive(Serialize)]
struct StorePrice<'a> {
    command: &'a str,
    #[serde(serialize_with = "serialize_number")]
    price: f64,
    timestamp: i64,
    #[serde(serialize_with = "serialize_number")]
    change_24h: f64,
}

/// Write whole-number floats without a fractional part (`150`, not `150.0`).
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Instruction data as read back by consumers.
#[derive(Deserialize)]
struct StoredPrice {
    command: String,
    price: f64,
    timestamp: i64,
    change_24h: f64,
    sources_count: Option<u32>,
    confidence: Option<f64>,
}

/// Serialize an observation into instruction data bytes.
pub fn encode_instruction_data(observation: &PriceObservation) -> Result<Vec<u8>, OracleError> {
    // serde_json would silently write non-finite floats as `null`.
    if !observation.price.is_finite() || !observation.change_24h.is_finite() {
        return Err(OracleError::Encoding(format!(
            "non-finite value in observation (price {}, change {})",
            observation.price, observation.change_24h
        )));
    }

    let data = StorePrice {
        command: STORE_PRICE_COMMAND,
        price: observation.price,
        timestamp: observation.timestamp,
        change_24h: observation.change_24h,
    };

    serde_json::to_vec(&data).map_err(|e| OracleError::Encoding(e.to_string()))
}

/// Build the `store_sol_price` instruction for an observation.
///
/// Accounts are, in order: proposal storage (writable), PoA state, the
/// instructions sysvar and the oracle program itself (all readonly).
pub fn encode(
    observation: &PriceObservation,
    addresses: &ProposalAddresses,
) -> Result<InstructionPayload, OracleError> {
    let data = encode_instruction_data(observation)?;

    Ok(InstructionPayload {
        program_address: PRICE_ORACLE_PROGRAM_ID,
        accounts: vec![
            AccountReference::writable(addresses.storage),
            AccountReference::readonly(addresses.state),
            AccountReference::readonly(sysvar::instructions::ID),
            AccountReference::readonly(PRICE_ORACLE_PROGRAM_ID),
        ],
        data,
    })
}

/// Read an observation back out of `store_sol_price` instruction data.
///
/// `sources_count` and `confidence` are not part of the encoded data and
/// fall back to 1 and 1.0 unless present.
pub fn decode_instruction_data(data: &[u8]) -> Result<PriceObservation, OracleError> {
    let stored: StoredPrice =
        serde_json::from_slice(data).map_err(|e| OracleError::Encoding(e.to_string()))?;

    if stored.command != STORE_PRICE_COMMAND {
        return Err(OracleError::Encoding(format!(
            "unexpected command {:?}",
            stored.command
        )));
    }

    let mut observation = PriceObservation::new(stored.price, stored.timestamp, stored.change_24h);
    if let Some(sources_count) = stored.sources_count {
        observation.sources_count = sources_count;
    }
    if let Some(confidence) = stored.confidence {
        observation.confidence = confidence;
    }
    Ok(observation)
}
