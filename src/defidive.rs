//! DefiDive client for the SOL/USD quote.
//!
//! Fetches the coin info document over HTTP and normalizes it into a
//! [`PriceObservation`]. A single failed attempt is reported as
//! [`OracleError::Upstream`]; there are no retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::error::OracleError;
use crate::types::PriceObservation;

/// Default DefiDive endpoint for SOL.
pub const DEFIDIVE_SOL_URL: &str = "https://api.defidive.com/coin/sol/info";

/// A source of price observations.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the latest observation.
    async fn fetch(&self) -> Result<PriceObservation, OracleError>;
}

/// DefiDive coin info response. Only the fields we use are listed.
#[derive(Debug, Deserialize)]
struct CoinInfo {
    price: Option<f64>,
    timestamp: Option<i64>,
    #[serde(alias = "change_24h", alias = "change24h")]
    price_change_percentage_24h: Option<f64>,
    sources_count: Option<u32>,
    confidence: Option<f64>,
}

/// HTTP client for the DefiDive API.
pub struct DefiDiveClient {
    http: reqwest::Client,
    url: String,
}

impl DefiDiveClient {
    /// Create a client for the default endpoint.
    pub fn new() -> Result<Self, OracleError> {
        Self::with_url(DEFIDIVE_SOL_URL, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    /// Create a client for a custom endpoint and request timeout.
    pub fn with_url(url: &str, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the latest SOL quote (one-shot).
    pub async fn fetch_latest(&self) -> Result<PriceObservation, OracleError> {
        info!("Fetching SOL price from {}", self.url);

        let response = self.http.get(&self.url).send().await?.error_for_status()?;
        let info: CoinInfo = response.json().await?;
        debug!("Price data received: {:?}", info);

        normalize(info)
    }
}

#[async_trait]
impl PriceSource for DefiDiveClient {
    async fn fetch(&self) -> Result<PriceObservation, OracleError> {
        self.fetch_latest().await
    }
}

/// Turn the upstream document into an observation, rejecting unusable data.
fn normalize(info: CoinInfo) -> Result<PriceObservation, OracleError> {
    let price = info
        .price
        .ok_or_else(|| OracleError::Upstream("response has no price".to_string()))?;
    let timestamp = info
        .timestamp
        .ok_or_else(|| OracleError::Upstream("response has no timestamp".to_string()))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(OracleError::Upstream(format!("unusable price {}", price)));
    }
    if timestamp < 0 {
        return Err(OracleError::Upstream(format!("unusable timestamp {}", timestamp)));
    }

    let mut observation =
        PriceObservation::new(price, timestamp, info.price_change_percentage_24h.unwrap_or(0.0));

    if let Some(sources_count) = info.sources_count {
        observation.sources_count = sources_count;
    }
    if let Some(confidence) = info.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(OracleError::Upstream(format!("confidence {} out of range", confidence)));
        }
        observation.confidence = confidence;
    }

    Ok(observation)
}
