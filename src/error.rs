//! Error type shared by the pipeline stages.

/// Errors surfaced by a payload run.
///
/// Every variant is fatal to the request: no payload is emitted and the
/// cache is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The upstream quote could not be fetched or was unusable.
    #[error("upstream price fetch failed: {0}")]
    Upstream(String),

    /// A program-derived address could not be derived from the seeds.
    #[error("address derivation failed: {0}")]
    Derivation(String),

    /// The observation could not be encoded into instruction data.
    #[error("payload encoding failed: {0}")]
    Encoding(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        OracleError::Upstream(e.to_string())
    }
}
