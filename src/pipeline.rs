//! Fetch → derive → encode pipeline with a TTL result cache.
//!
//! A run serves the cached result while it is fresh. On a miss it fetches
//! one observation, derives the proposal addresses, encodes the instruction
//! and caches the result. Any failure leaves the cache as it was.

use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::defidive::PriceSource;
use crate::encoder;
use crate::error::OracleError;
use crate::pda::ProposalAddresses;
use crate::types::{InstructionPayload, OracleRequest, PriceObservation, ProposalDocument};

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleResponse {
    pub observation: PriceObservation,
    pub payload: InstructionPayload,

    /// When the observation was fetched, in Unix milliseconds
    pub fetched_at_millis: i64,

    /// Whether this response was served from cache
    pub cached: bool,
}

impl OracleResponse {
    /// The proposal document for this response.
    pub fn document(&self) -> ProposalDocument {
        ProposalDocument::single(self.payload.clone())
    }

    /// Human-readable price summary.
    pub fn summary(&self) -> String {
        let obs = &self.observation;
        let sign = if obs.change_24h >= 0.0 { "+" } else { "" };
        let sources = if obs.sources_count > 0 {
            obs.sources_count.to_string()
        } else {
            "Unknown".to_string()
        };
        let confidence = if obs.confidence > 0.0 {
            format!("{}%", (obs.confidence * 100.0).round())
        } else {
            "Unknown".to_string()
        };
        let updated = obs
            .last_updated()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        format!(
            "Current SOL price: ${:.2} ({}{:.2}% 24h)\n\
             Data sources: {}\nConfidence: {}\nLast updated: {}",
            obs.price, sign, obs.change_24h, sources, confidence, updated
        )
    }
}

/// Pipeline orchestrator. Owns the result cache; share it behind a mutex to
/// serialize runs.
pub struct Pipeline<S> {
    source: S,
    cache: ResultCache,
}

impl<S: PriceSource> Pipeline<S> {
    /// Create a pipeline with the default cache TTL.
    pub fn new(source: S) -> Self {
        Self::with_cache(source, ResultCache::new())
    }

    pub fn with_cache(source: S, cache: ResultCache) -> Self {
        Self { source, cache }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Run the pipeline at the current wall-clock time.
    pub async fn run(&mut self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        self.run_at(request, chrono::Utc::now().timestamp_millis()).await
    }

    /// Run the pipeline as of `now_millis`.
    pub async fn run_at(
        &mut self,
        request: &OracleRequest,
        now_millis: i64,
    ) -> Result<OracleResponse, OracleError> {
        if self.cache.is_valid(now_millis) {
            if let Some(entry) = self.cache.get() {
                info!(
                    "Using cached oracle data ({} ms old)",
                    now_millis - entry.fetched_at_millis
                );
                return Ok(OracleResponse {
                    observation: entry.observation.clone(),
                    payload: entry.payload.clone(),
                    fetched_at_millis: entry.fetched_at_millis,
                    cached: true,
                });
            }
        }

        if let Some(age) = self.cache.age_millis(now_millis) {
            debug!("Cached oracle data expired ({} ms old)", age);
        }

        let observation = self.source.fetch().await.map_err(|e| {
            warn!("Price fetch failed: {}", e);
            e
        })?;

        let addresses =
            ProposalAddresses::derive(&request.poa_name, &request.proposal_storage_key)?;
        debug!(
            "Proposal storage {} / PoA state {} for {:?}",
            addresses.storage, addresses.state, request.poa_name
        );

        let payload = encoder::encode(&observation, &addresses)?;

        self.cache.put(observation.clone(), payload.clone(), now_millis);
        info!(
            "SOL ${:.4} ({:+.2}% 24h) encoded into {} bytes of instruction data",
            observation.price,
            observation.change_24h,
            payload.data.len()
        );

        Ok(OracleResponse {
            observation,
            payload,
            fetched_at_millis: now_millis,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_CACHE_TTL_MS;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Price source returning a scripted result and counting calls.
    struct MockSource {
        calls: AtomicUsize,
        result: Mutex<Result<PriceObservation, OracleError>>,
    }

    impl MockSource {
        fn returning(result: Result<PriceObservation, OracleError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Mutex::new(result),
            }
        }

        fn set(&self, result: Result<PriceObservation, OracleError>) {
            *self.result.lock().unwrap() = result;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for MockSource {
        async fn fetch(&self) -> Result<PriceObservation, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.lock().unwrap().clone()
        }
    }

    fn sol(price: f64) -> PriceObservation {
        PriceObservation::new(price, 1_700_000_000, 2.5)
    }

    fn network_error() -> OracleError {
        OracleError::Upstream("connection refused".to_string())
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let mut pipeline = Pipeline::new(MockSource::returning(Ok(sol(150.25))));
        let request = OracleRequest::default();

        let response = pipeline.run_at(&request, 1_000).await.unwrap();

        assert!(!response.cached);
        assert_eq!(response.observation, sol(150.25));
        assert_eq!(response.fetched_at_millis, 1_000);
        assert_eq!(pipeline.source().calls(), 1);

        let entry = pipeline.cache().get().unwrap();
        assert_eq!(entry.observation, sol(150.25));
        assert_eq!(entry.payload, response.payload);
        assert_eq!(
            response.payload.data,
            br#"{"command":"store_sol_price","price":150.25,"timestamp":1700000000,"change_24h":2.5}"#
        );
    }

    #[tokio::test]
    async fn test_hit_within_ttl_skips_fetch() {
        let mut pipeline = Pipeline::new(MockSource::returning(Ok(sol(150.25))));
        let request = OracleRequest::default();

        let first = pipeline.run_at(&request, 1_000).await.unwrap();
        pipeline.source().set(Ok(sol(999.0)));
        let second = pipeline.run_at(&request, 2_000).await.unwrap();

        assert!(second.cached);
        assert_eq!(second.observation, first.observation);
        assert_eq!(second.payload, first.payload);
        assert_eq!(second.fetched_at_millis, 1_000);
        assert_eq!(pipeline.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_refetch_after_ttl() {
        let mut pipeline = Pipeline::new(MockSource::returning(Ok(sol(150.25))));
        let request = OracleRequest::default();

        pipeline.run_at(&request, 0).await.unwrap();
        pipeline.source().set(Ok(sol(151.0)));

        let response = pipeline.run_at(&request, DEFAULT_CACHE_TTL_MS).await.unwrap();
        assert!(!response.cached);
        assert_eq!(response.observation.price, 151.0);
        assert_eq!(pipeline.source().calls(), 2);
        assert_eq!(pipeline.cache().get().unwrap().fetched_at_millis, DEFAULT_CACHE_TTL_MS);
    }

    #[tokio::test]
    async fn test_upstream_error_on_empty_cache() {
        let mut pipeline = Pipeline::new(MockSource::returning(Err(network_error())));

        let result = pipeline.run_at(&OracleRequest::default(), 1_000).await;

        assert_eq!(result, Err(network_error()));
        assert!(pipeline.cache().get().is_none());
        assert_eq!(pipeline.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_upstream_error_leaves_stale_entry() {
        let mut pipeline = Pipeline::with_cache(
            MockSource::returning(Ok(sol(150.25))),
            ResultCache::with_ttl(1_000),
        );
        let request = OracleRequest::default();

        pipeline.run_at(&request, 0).await.unwrap();
        let before = pipeline.cache().get().cloned();

        pipeline.source().set(Err(network_error()));
        let result = pipeline.run_at(&request, 5_000).await;

        assert!(matches!(result, Err(OracleError::Upstream(_))));
        assert_eq!(pipeline.cache().get().cloned(), before);
        assert_eq!(pipeline.source().calls(), 2);
    }

    #[tokio::test]
    async fn test_derivation_error_is_fatal() {
        let mut pipeline = Pipeline::new(MockSource::returning(Ok(sol(150.25))));
        let request = OracleRequest {
            poa_name: "x".repeat(64),
            ..OracleRequest::default()
        };

        let result = pipeline.run_at(&request, 0).await;

        assert!(matches!(result, Err(OracleError::Derivation(_))));
        assert!(pipeline.cache().get().is_none());
    }

    #[tokio::test]
    async fn test_encoding_error_is_fatal() {
        let mut pipeline = Pipeline::new(MockSource::returning(Ok(PriceObservation::new(
            150.25,
            1_700_000_000,
            f64::NAN,
        ))));

        let result = pipeline.run_at(&OracleRequest::default(), 0).await;

        assert!(matches!(result, Err(OracleError::Encoding(_))));
        assert!(pipeline.cache().get().is_none());
    }

    #[tokio::test]
    async fn test_shared_pipeline_fetches_once() {
        let pipeline = Arc::new(tokio::sync::Mutex::new(Pipeline::new(MockSource::returning(
            Ok(sol(150.25)),
        ))));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pipeline = pipeline.clone();
            handles.push(tokio::spawn(async move {
                pipeline.lock().await.run(&OracleRequest::default()).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().observation, sol(150.25));
        }

        assert_eq!(pipeline.lock().await.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_summary_text() {
        let mut pipeline = Pipeline::new(MockSource::returning(Ok(sol(150.25))));
        let response = pipeline.run_at(&OracleRequest::default(), 0).await.unwrap();

        assert_eq!(
            response.summary(),
            "Current SOL price: $150.25 (+2.50% 24h)\n\
             Data sources: 1\nConfidence: 100%\nLast updated: 2023-11-14 22:13:20 UTC"
        );

        let mut obs = PriceObservation::new(98.7, 1_700_000_000, -1.234);
        obs.confidence = 0.0;
        let response = OracleResponse { observation: obs, ..response };
        let summary = response.summary();
        assert!(summary.starts_with("Current SOL price: $98.70 (-1.23% 24h)"));
        assert!(summary.contains("Confidence: Unknown"));
    }

    #[tokio::test]
    async fn test_document_wraps_payload() {
        let mut pipeline = Pipeline::new(MockSource::returning(Ok(sol(150.25))));
        let response = pipeline.run_at(&OracleRequest::default(), 0).await.unwrap();

        let document = response.document();
        assert_eq!(document.proposal_instructions, vec![response.payload.clone()]);
        assert_eq!(
            encoder::decode_instruction_data(&document.proposal_instructions[0].data).unwrap(),
            response.observation
        );
    }
}
