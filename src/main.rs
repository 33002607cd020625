//! Cambrian Oracle Payload
//!
//! Reads a JSON request, runs the price pipeline and prints a JSON proposal
//! document (or `{"error": ...}`) on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # One-shot, as a payload image
//! CAMB_INPUT='{"poaName":"mainnet1"}' cargo run
//!
//! # Long-running: one request per stdin line, sharing the cache
//! cargo run
//! ```

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use cambrian_oracle::config::INPUT_ENV;
use cambrian_oracle::payload::{handle_request, PayloadOutput};
use cambrian_oracle::{DefiDiveClient, OracleConfig, Pipeline, ResultCache};

/// Serve requests, returning whether all of them succeeded.
async fn run() -> anyhow::Result<bool> {
    let config = OracleConfig::from_env();
    info!(
        "Price source {} (timeout {:?}, cache TTL {} ms)",
        config.price_url, config.fetch_timeout, config.cache_ttl_ms
    );

    let source = DefiDiveClient::with_url(&config.price_url, config.fetch_timeout)
        .context("failed to build price client")?;
    let mut pipeline = Pipeline::with_cache(source, ResultCache::with_ttl(config.cache_ttl_ms));

    // One-shot payload run
    if let Ok(input) = std::env::var(INPUT_ENV) {
        let output = handle_request(&mut pipeline, &input).await;
        println!("{}", output.line);
        return Ok(output.success);
    }

    info!("No {} set, reading requests from stdin", INPUT_ENV);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut all_ok = true;

    while let Some(raw) = lines.next_line().await.context("failed to read request")? {
        if raw.trim().is_empty() {
            continue;
        }
        let output = handle_request(&mut pipeline, &raw).await;
        println!("{}", output.line);
        all_ok &= output.success;
    }

    Ok(all_ok)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            println!("{}", PayloadOutput::failure(&e).line);
            std::process::exit(1);
        }
    }
}
