//! Price cache writer
//!
//! Upserts the latest price per ticker into the shared cache table the
//! dashboard reads from.

mod sqlite;

pub use sqlite::{CacheEntry, SqliteCacheWriter};

use crate::error::RefreshError;
use crate::market::{PriceRecord, Ticker};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Trait for price cache implementations
#[async_trait]
pub trait CacheWriter: Send + Sync {
    /// Upsert one row per distinct ticker, returning the number written
    ///
    /// When `records` repeats a ticker, the last occurrence wins. An empty
    /// slice returns 0 without touching the store.
    async fn upsert(&self, records: &[PriceRecord]) -> Result<usize, RefreshError>;
}

/// Collapse duplicate tickers, keeping the last record in iteration order
pub fn latest_per_ticker(records: &[PriceRecord]) -> BTreeMap<&Ticker, &PriceRecord> {
    let mut latest = BTreeMap::new();
    for record in records {
        latest.insert(record.ticker(), record);
    }
    latest
}
