//! Single-slot result cache.
//!
//! Holds the most recent successful pipeline result and serves it while it
//! is younger than the TTL. Validity is checked lazily on read; there is no
//! eviction task.

use tracing::debug;

use crate::types::{InstructionPayload, PriceObservation};

/// Default cache TTL in milliseconds (5 minutes).
pub const DEFAULT_CACHE_TTL_MS: i64 = 5 * 60 * 1000;

/// The cached result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    /// The observation that was fetched
    pub observation: PriceObservation,

    /// Wall-clock time of the fetch, in Unix milliseconds
    pub fetched_at_millis: i64,

    /// The payload encoded from the observation
    pub payload: InstructionPayload,
}

/// TTL-gated cache holding at most one entry.
pub struct ResultCache {
    entry: Option<CachedResult>,
    ttl_ms: i64,
}

impl ResultCache {
    /// Create an empty cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL_MS)
    }

    /// Create an empty cache with a custom TTL.
    pub fn with_ttl(ttl_ms: i64) -> Self {
        Self { entry: None, ttl_ms }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// The stored entry, fresh or not.
    pub fn get(&self) -> Option<&CachedResult> {
        self.entry.as_ref()
    }

    /// Replace the stored entry.
    pub fn put(
        &mut self,
        observation: PriceObservation,
        payload: InstructionPayload,
        now_millis: i64,
    ) {
        debug!(
            "Caching ${:.4} observed at {} (fetched at {})",
            observation.price, observation.timestamp, now_millis
        );
        self.entry = Some(CachedResult {
            observation,
            fetched_at_millis: now_millis,
            payload,
        });
    }

    /// Whether an entry exists and is younger than the TTL at `now_millis`.
    pub fn is_valid(&self, now_millis: i64) -> bool {
        match &self.entry {
            Some(entry) => now_millis - entry.fetched_at_millis < self.ttl_ms,
            None => false,
        }
    }

    /// Age of the stored entry at `now_millis`.
    pub fn age_millis(&self, now_millis: i64) -> Option<i64> {
        self.entry
            .as_ref()
            .map(|entry| now_millis - entry.fetched_at_millis)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
