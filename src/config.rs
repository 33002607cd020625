//! Runtime configuration, read from the environment.

use std::time::Duration;

use tracing::warn;

use crate::cache::DEFAULT_CACHE_TTL_MS;
use crate::defidive::DEFIDIVE_SOL_URL;

/// Environment variable carrying the JSON request for one-shot runs.
pub const INPUT_ENV: &str = "CAMB_INPUT";

/// Default upstream request timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Settings for the oracle pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    /// Upstream price endpoint
    pub price_url: String,

    /// Timeout applied to each upstream request
    pub fetch_timeout: Duration,

    /// How long a fetched result is served from cache, in milliseconds
    pub cache_ttl_ms: i64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            price_url: DEFIDIVE_SOL_URL.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

impl OracleConfig {
    /// Build the configuration from `ORACLE_*` environment variables,
    /// falling back to defaults for anything unset or malformed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let price_url = lookup("ORACLE_PRICE_URL").unwrap_or(defaults.price_url);

        let fetch_timeout =
            parse_or(&lookup, "ORACLE_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS);
        let cache_ttl_ms = parse_or(&lookup, "ORACLE_CACHE_TTL_MS", defaults.cache_ttl_ms);

        Self {
            price_url,
            fetch_timeout: Duration::from_secs(fetch_timeout),
            cache_ttl_ms,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
