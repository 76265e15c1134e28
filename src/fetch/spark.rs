//! Spark endpoint client for batched quote lookups
//!
//! Requests recent intraday closes for many symbols in one call:
//! `GET {base_url}/v7/finance/spark?symbols=A,B,C&range=1d&interval=1m`.

use super::types::{normalize_response, SparkResponse};
use super::BatchPriceFetcher;
use crate::error::RefreshError;
use crate::market::{PriceRecord, Ticker};
use crate::telemetry::{record_latency, LatencyMetric};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Default quote provider base URL
pub const DEFAULT_PROVIDER_URL: &str = "https://query1.finance.yahoo.com";

/// Header carrying the provider API key, when one is configured
pub const API_KEY_HEADER: &str = "X-API-KEY";

const SPARK_PATH: &str = "/v7/finance/spark";
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Configuration for the spark client
#[derive(Debug, Clone)]
pub struct SparkConfig {
    /// Provider base URL
    pub base_url: String,
    /// Optional API key sent as [`API_KEY_HEADER`]
    pub api_key: Option<String>,
    /// Lookback period (e.g., "1d")
    pub range: String,
    /// Sampling interval (e.g., "1m")
    pub interval: String,
    /// Upper bound for one whole `fetch`, retries included
    pub timeout: Duration,
    /// Symbols per request; larger universes are split
    pub max_batch_size: usize,
    /// Retries on 429/503 before giving up
    pub max_retries: u32,
    /// First retry delay, doubled per attempt
    pub initial_backoff: Duration,
}

impl Default for SparkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            api_key: None,
            range: "1d".to_string(),
            interval: "1m".to_string(),
            timeout: Duration::from_secs(20),
            max_batch_size: 500,
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Batched quote client
pub struct SparkClient {
    config: SparkConfig,
    client: Client,
}

impl SparkClient {
    /// Build the client; an unusable base URL is rejected here
    pub fn new(config: SparkConfig) -> anyhow::Result<Self> {
        Url::parse(&config.base_url)
            .with_context(|| format!("Invalid quote provider URL: {}", config.base_url))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("market-refresh/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SparkConfig {
        &self.config
    }

    fn spark_url(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), SPARK_PATH)
    }

    /// One batched request, retried while the provider is throttling
    async fn fetch_batch(&self, symbols: &str) -> Result<SparkResponse, RefreshError> {
        let url = self.spark_url();
        let mut attempt = 0u32;
        let mut delay = self.config.initial_backoff;

        loop {
            let mut request = self.client.get(&url).query(&[
                ("symbols", symbols),
                ("range", self.config.range.as_str()),
                ("interval", self.config.interval.as_str()),
            ]);
            if let Some(key) = &self.config.api_key {
                request = request.header(API_KEY_HEADER, key);
            }

            let response = request
                .send()
                .await
                .map_err(|e| RefreshError::FetchFailed(format!("request error: {}", e)))?;
            let status = response.status();

            if is_throttled(status) && attempt < self.config.max_retries {
                attempt += 1;
                tracing::warn!(
                    status = %status,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Quote provider throttled, backing off"
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RefreshError::FetchFailed(format!(
                    "quote provider returned {}: {}",
                    status,
                    truncate(&body, 200)
                )));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| RefreshError::FetchFailed(format!("reading body: {}", e)))?;
            return serde_json::from_slice(&body)
                .map_err(|e| RefreshError::FetchFailed(format!("malformed response: {}", e)));
        }
    }

    async fn fetch_all(
        &self,
        tickers: &BTreeSet<Ticker>,
    ) -> Result<BTreeMap<Ticker, PriceRecord>, RefreshError> {
        let all: Vec<&Ticker> = tickers.iter().collect();
        let mut records = BTreeMap::new();

        for chunk in all.chunks(self.config.max_batch_size.max(1)) {
            let symbols = chunk
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(",");
            let requested: BTreeSet<Ticker> = chunk.iter().map(|t| (*t).clone()).collect();

            let response = self.fetch_batch(&symbols).await?;
            records.extend(normalize_response(response, &requested, Utc::now()));
        }

        Ok(records)
    }
}

#[async_trait]
impl BatchPriceFetcher for SparkClient {
    async fn fetch(
        &self,
        tickers: &BTreeSet<Ticker>,
    ) -> Result<BTreeMap<Ticker, PriceRecord>, RefreshError> {
        if tickers.is_empty() {
            return Ok(BTreeMap::new());
        }

        let start = Instant::now();
        let records = tokio::time::timeout(self.config.timeout, self.fetch_all(tickers))
            .await
            .map_err(|_| {
                RefreshError::FetchFailed(format!("timed out after {:?}", self.config.timeout))
            })??;
        record_latency(LatencyMetric::Fetch, start.elapsed());

        tracing::debug!(
            requested = tickers.len(),
            resolved = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched batch prices"
        );

        Ok(records)
    }
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
