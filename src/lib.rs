//! Cambrian Oracle Payload
//!
//! This crate turns the current SOL/USD quote into a proposal instruction
//! for the on-chain price oracle program.
//!
//! # Features
//!
//! - **DefiDive quote fetching** with field normalization
//! - **Program-derived addresses** for proposal storage and PoA state
//! - **JSON instruction data** (`store_sol_price`) with a fixed account list
//! - **TTL result cache** so repeated requests do not hit the upstream
//!
//! # Example
//!
//! ```no_run
//! use cambrian_oracle::{DefiDiveClient, OracleRequest, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut pipeline = Pipeline::new(DefiDiveClient::new()?);
//!
//!     let response = pipeline.run(&OracleRequest::default()).await?;
//!     println!("{}", response.summary());
//!     println!("{}", serde_json::to_string(&response.document())?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod defidive;
pub mod encoder;
pub mod error;
pub mod payload;
pub mod pda;
pub mod pipeline;

/// Wire-format types, re-exported from `cambrian-oracle-types`.
pub mod types {
    pub use cambrian_oracle_types::*;
}

pub use cache::{CachedResult, ResultCache, DEFAULT_CACHE_TTL_MS};
pub use config::OracleConfig;
pub use defidive::{DefiDiveClient, PriceSource, DEFIDIVE_SOL_URL};
pub use encoder::{decode_instruction_data, encode, PRICE_ORACLE_PROGRAM_ID};
pub use error::OracleError;
pub use pda::{DerivationSeedSet, ProposalAddresses, THRESHOLD_SIGNATURE_PROGRAM_ID};
pub use pipeline::{OracleResponse, Pipeline};
pub use types::{
    AccountReference, AccountRole, ErrorDocument, InstructionPayload, OracleRequest,
    PriceObservation, ProposalDocument,
};
