//! JSON-in / JSON-out boundary of the payload.
//!
//! Each raw request produces exactly one output line: the proposal document
//! on success, or `{"error": ...}` on any failure.

use anyhow::Context;
use serde::Serialize;
use tracing::{error, info};

use crate::defidive::PriceSource;
use crate::pipeline::Pipeline;
use crate::types::{ErrorDocument, OracleRequest};

/// One output line and whether the request succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadOutput {
    pub line: String,
    pub success: bool,
}

impl PayloadOutput {
    /// Output for an error raised outside a pipeline run.
    pub fn failure(e: &anyhow::Error) -> Self {
        error!("Error: {:#}", e);
        Self {
            line: error_line(&format!("{:#}", e)),
            success: false,
        }
    }
}

/// Run one raw JSON request. A blank request is treated as `{}`.
pub async fn handle_request<S: PriceSource>(
    pipeline: &mut Pipeline<S>,
    raw: &str,
) -> PayloadOutput {
    match run_request(pipeline, raw).await {
        Ok(line) => PayloadOutput {
            line,
            success: true,
        },
        Err(e) => PayloadOutput::failure(&e),
    }
}

async fn run_request<S: PriceSource>(
    pipeline: &mut Pipeline<S>,
    raw: &str,
) -> anyhow::Result<String> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    let request: OracleRequest = serde_json::from_str(raw).context("invalid request JSON")?;
    info!("Input: {:?}", request);

    let response = pipeline.run(&request).await?;
    info!("{}", response.summary().replace('\n', " | "));

    Ok(serde_json::to_string(&response.document())?)
}

/// The `{"error": ...}` document for a message.
pub fn error_line(message: &str) -> String {
    to_json(&ErrorDocument::new(message))
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| r#"{"error":"Unknown error"}"#.to_string())
}
