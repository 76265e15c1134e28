//! SQLite-backed price cache

use super::{latest_per_ticker, CacheWriter};
use crate::error::RefreshError;
use crate::market::PriceRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;
use tokio::sync::OnceCell;

/// A row of the price cache table
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub ticker: String,
    pub price: Decimal,
    /// Upstream sample time of `price`
    pub observed_at: DateTime<Utc>,
    /// Time the row was last written
    pub updated_at: DateTime<Utc>,
}

/// Price cache keyed by ticker
///
/// Rows only move forward in time: an update carrying an older
/// `observed_at` than the stored row is ignored, so overlapping refresh
/// cycles and other writers can apply their batches in any order.
pub struct SqliteCacheWriter {
    pool: SqlitePool,
    table: String,
    schema_ready: OnceCell<()>,
}

impl SqliteCacheWriter {
    /// Create a writer for `table`; the name must be a plain identifier
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            schema_ready: OnceCell::new(),
        }
    }

    /// Create the cache table if it does not exist (runs at most once)
    pub async fn ensure_schema(&self) -> Result<(), RefreshError> {
        self.schema_ready
            .get_or_try_init(|| async {
                let sql = format!(
                    r#"
                    CREATE TABLE IF NOT EXISTS {} (
                        ticker TEXT PRIMARY KEY NOT NULL,
                        price TEXT NOT NULL,
                        observed_at_ms INTEGER NOT NULL,
                        updated_at TEXT NOT NULL
                    )
                    "#,
                    self.table
                );
                sqlx::query(&sql)
                    .execute(&self.pool)
                    .await
                    .map(|_| ())
                    .map_err(|e| RefreshError::WriteFailed(e.to_string()))
            })
            .await?;
        Ok(())
    }

    /// All cached rows ordered by ticker
    pub async fn entries(&self) -> anyhow::Result<Vec<CacheEntry>> {
        let sql = format!(
            "SELECT ticker, price, observed_at_ms, updated_at FROM {} ORDER BY ticker",
            self.table
        );
        let rows: Vec<(String, String, i64, DateTime<Utc>)> =
            sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|(ticker, price, observed_at_ms, updated_at)| {
                let price = Decimal::from_str(&price)
                    .map_err(|e| anyhow::anyhow!("Bad cached price for {}: {}", ticker, e))?;
                let observed_at = DateTime::from_timestamp_millis(observed_at_ms)
                    .ok_or_else(|| anyhow::anyhow!("Bad observed_at for {}", ticker))?;
                Ok(CacheEntry {
                    ticker,
                    price,
                    observed_at,
                    updated_at,
                })
            })
            .collect()
    }

    /// Single cached row, if present
    pub async fn get(&self, ticker: &str) -> anyhow::Result<Option<CacheEntry>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .find(|entry| entry.ticker == ticker))
    }
}

#[async_trait]
impl CacheWriter for SqliteCacheWriter {
    async fn upsert(&self, records: &[PriceRecord]) -> Result<usize, RefreshError> {
        if records.is_empty() {
            return Ok(0);
        }

        self.ensure_schema().await?;

        let latest = latest_per_ticker(records);
        let updated_at = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO {t} (ticker, price, observed_at_ms, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(ticker) DO UPDATE SET
                price = excluded.price,
                observed_at_ms = excluded.observed_at_ms,
                updated_at = excluded.updated_at
            WHERE excluded.observed_at_ms >= {t}.observed_at_ms
            "#,
            t = self.table
        );

        let write_failed = |e: sqlx::Error| RefreshError::WriteFailed(e.to_string());

        let mut tx = self.pool.begin().await.map_err(write_failed)?;
        let mut written = 0usize;
        for record in latest.values() {
            let result = sqlx::query(&sql)
                .bind(record.ticker().as_str())
                .bind(record.price().to_string())
                .bind(record.observed_at().timestamp_millis())
                .bind(updated_at)
                .execute(&mut *tx)
                .await
                .map_err(write_failed)?;
            written += result.rows_affected() as usize;
        }
        tx.commit().await.map_err(write_failed)?;

        let stale = latest.len() - written;
        if stale > 0 {
            tracing::debug!(stale, "Cache already held newer prices for some tickers");
        }
        tracing::debug!(
            table = %self.table,
            records = records.len(),
            distinct = latest.len(),
            written,
            "Upserted price batch"
        );

        Ok(written)
    }
}
