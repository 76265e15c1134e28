//! Ticker universe source
//!
//! Reads the set of tracked instruments from the side table another process
//! maintains. Every call re-reads the store.

mod sqlite;

pub use sqlite::SqliteTickerSource;

use crate::error::RefreshError;
use crate::market::Ticker;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Trait for ticker universe implementations
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Current universe; empty when the store holds no rows
    ///
    /// Fails with [`RefreshError::SourceUnavailable`] if the store cannot be
    /// reached or queried.
    async fn list_tickers(&self) -> Result<BTreeSet<Ticker>, RefreshError>;
}
