//! Program-derived address derivation.
//!
//! Addresses are found the same way the Solana runtime does it: the bump
//! seed is searched from 255 downwards and the first seed set that hashes
//! off the ed25519 curve wins.

use solana_program::pubkey::{Pubkey, PubkeyError, MAX_SEEDS, MAX_SEED_LEN};
use tracing::debug;

use crate::error::OracleError;

/// Threshold signature program that owns the proposal storage and PoA state.
pub const THRESHOLD_SIGNATURE_PROGRAM_ID: Pubkey =
    solana_program::pubkey!("FGgNUqGxdEYM1gVtQT5QcTbzNv4y1UPoVvXPRnooBdxo");

/// Seed prefix of the proposal storage account.
pub const STORAGE_SEED: &[u8] = b"STORAGE";

/// Seed prefix of the PoA state account.
pub const STATE_SEED: &[u8] = b"STATE";

/// Space reserved in proposal storage (3 slots of 25 bytes).
pub const STORAGE_SPACE: u64 = 3 * 25;

/// Ordered seeds plus the program they are derived against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationSeedSet {
    pub seeds: Vec<Vec<u8>>,
    pub program_id: Pubkey,
}

impl DerivationSeedSet {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            seeds: Vec::new(),
            program_id,
        }
    }

    /// Append a seed.
    pub fn seed(mut self, seed: impl AsRef<[u8]>) -> Self {
        self.seeds.push(seed.as_ref().to_vec());
        self
    }

    /// Seeds of the proposal storage account.
    pub fn storage(poa_name: &str, proposal_storage_key: &str) -> Self {
        Self::new(THRESHOLD_SIGNATURE_PROGRAM_ID)
            .seed(STORAGE_SEED)
            .seed(poa_name)
            .seed(proposal_storage_key)
            .seed(STORAGE_SPACE.to_le_bytes())
    }

    /// Seeds of the PoA state account, keyed by the UTF-8 PoA name.
    pub fn state(poa_name: &str) -> Self {
        let poa_state_key = poa_name.as_bytes();
        Self::new(THRESHOLD_SIGNATURE_PROGRAM_ID)
            .seed(STATE_SEED)
            .seed(poa_state_key)
    }
}

/// Derive the address for a seed set, returning it with its bump seed.
pub fn derive_with_bump(seed_set: &DerivationSeedSet) -> Result<(Pubkey, u8), OracleError> {
    // One slot is reserved for the bump seed.
    if seed_set.seeds.len() >= MAX_SEEDS {
        return Err(OracleError::Derivation(format!(
            "{} seeds given, at most {} allowed",
            seed_set.seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    if let Some((index, seed)) = seed_set
        .seeds
        .iter()
        .enumerate()
        .find(|(_, seed)| seed.len() > MAX_SEED_LEN)
    {
        return Err(OracleError::Derivation(format!(
            "seed {} is {} bytes, at most {} allowed",
            index,
            seed.len(),
            MAX_SEED_LEN
        )));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut seeds: Vec<&[u8]> = seed_set.seeds.iter().map(Vec::as_slice).collect();
        seeds.push(&bump_seed);

        match Pubkey::create_program_address(&seeds, &seed_set.program_id) {
            Ok(address) => {
                debug!("Derived {} (bump {}) for program {}", address, bump, seed_set.program_id);
                return Ok((address, bump));
            }
            Err(PubkeyError::InvalidSeeds) => continue,
            Err(e) => return Err(OracleError::Derivation(e.to_string())),
        }
    }

    Err(OracleError::Derivation("no viable bump seed found".to_string()))
}

/// Derive the address for a seed set.
pub fn derive(seed_set: &DerivationSeedSet) -> Result<Pubkey, OracleError> {
    derive_with_bump(seed_set).map(|(address, _)| address)
}

/// The pair of addresses a price proposal writes to and reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalAddresses {
    pub storage: Pubkey,
    pub state: Pubkey,
}

impl ProposalAddresses {
    pub fn derive(poa_name: &str, proposal_storage_key: &str) -> Result<Self, OracleError> {
        Ok(Self {
            storage: derive(&DerivationSeedSet::storage(poa_name, proposal_storage_key))?,
            state: derive(&DerivationSeedSet::state(poa_name))?,
        })
    }
}
