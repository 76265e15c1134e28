//! Batched price fetching
//!
//! Pulls the latest trade price for a whole ticker universe from the
//! upstream quote provider in a single request.

mod spark;
mod types;

pub use spark::{SparkClient, SparkConfig, API_KEY_HEADER, DEFAULT_PROVIDER_URL};
pub use types::{normalize_response, SparkResponse, SparkSeries};

use crate::error::RefreshError;
use crate::market::{PriceRecord, Ticker};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// Trait for batched price fetcher implementations
#[async_trait]
pub trait BatchPriceFetcher: Send + Sync {
    /// Latest price per ticker
    ///
    /// Tickers without a resolvable price are absent from the map. A failed
    /// or timed out upstream call fails the whole fetch with
    /// [`RefreshError::FetchFailed`].
    async fn fetch(
        &self,
        tickers: &BTreeSet<Ticker>,
    ) -> Result<BTreeMap<Ticker, PriceRecord>, RefreshError>;
}
