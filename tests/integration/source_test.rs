//! Integration tests for the SQLite ticker source

use super::{sqlite_url, tickers};
use market_refresh::error::RefreshError;
use market_refresh::source::{SqliteTickerSource, TickerSource};
use market_refresh::store::lazy_pool;
use sqlx::SqlitePool;

async fn seed(pool: &SqlitePool, symbols: &[Option<&str>]) {
    // Nullable column so missing symbols can be seeded
    sqlx::query("CREATE TABLE tracked_tickers (symbol TEXT)")
        .execute(pool)
        .await
        .unwrap();
    for symbol in symbols {
        sqlx::query("INSERT INTO tracked_tickers (symbol) VALUES (?1)")
            .bind(*symbol)
            .execute(pool)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_lists_normalized_distinct_tickers() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_url(&dir, "dashboard.db");
    let pool = lazy_pool(&url, true).unwrap();
    seed(
        &pool,
        &[
            Some("aapl"),
            Some(" MSFT "),
            Some("AAPL"),
            Some(""),
            Some("   "),
            None,
            Some("rivn"),
        ],
    )
    .await;

    // Reopen the way the refresh job does: existing store only
    let source = SqliteTickerSource::new(lazy_pool(&url, false).unwrap(), "tracked_tickers");
    let listed = source.list_tickers().await.unwrap();

    assert_eq!(listed, tickers(&["AAPL", "MSFT", "RIVN"]));
}

#[tokio::test]
async fn test_empty_table_is_not_an_error() {
    let pool = lazy_pool("sqlite::memory:", true).unwrap();
    let source = SqliteTickerSource::new(pool, "tracked_tickers");
    source.ensure_schema().await.unwrap();

    let listed = source.list_tickers().await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_missing_table_is_unavailable() {
    let pool = lazy_pool("sqlite::memory:", true).unwrap();
    let source = SqliteTickerSource::new(pool, "tracked_tickers");

    let result = source.list_tickers().await;
    assert!(matches!(result, Err(RefreshError::SourceUnavailable(_))));
}

#[tokio::test]
async fn test_missing_database_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_url(&dir, "absent.db");
    let source = SqliteTickerSource::new(lazy_pool(&url, false).unwrap(), "tracked_tickers");

    let result = source.list_tickers().await;
    assert!(matches!(result, Err(RefreshError::SourceUnavailable(_))));
    assert!(!dir.path().join("absent.db").exists());
}
