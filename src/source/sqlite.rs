//! SQLite-backed ticker source

use super::TickerSource;
use crate::error::RefreshError;
use crate::market::Ticker;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeSet;

/// Reads the `symbol` column of a tracked-tickers table
pub struct SqliteTickerSource {
    pool: SqlitePool,
    table: String,
}

impl SqliteTickerSource {
    /// Create a source over `table`; the name must be a plain identifier
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Create the tickers table if it does not exist
    ///
    /// Production stores are populated elsewhere; this exists for local
    /// setups and tests.
    pub async fn ensure_schema(&self) -> Result<(), RefreshError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (symbol TEXT NOT NULL)",
            self.table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| RefreshError::SourceUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl TickerSource for SqliteTickerSource {
    async fn list_tickers(&self) -> Result<BTreeSet<Ticker>, RefreshError> {
        let sql = format!("SELECT symbol FROM {}", self.table);
        let rows: Vec<(Option<String>,)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RefreshError::SourceUnavailable(e.to_string()))?;

        let row_count = rows.len();
        let tickers: BTreeSet<Ticker> = rows
            .into_iter()
            .filter_map(|(symbol,)| symbol.as_deref().and_then(Ticker::new))
            .collect();

        tracing::debug!(
            table = %self.table,
            rows = row_count,
            tickers = tickers.len(),
            "Loaded ticker universe"
        );

        Ok(tickers)
    }
}
