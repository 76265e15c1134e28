//! Integration tests for the SQLite price cache

use super::{sqlite_url, ticker, utc};
use market_refresh::cache::{CacheWriter, SqliteCacheWriter};
use market_refresh::error::RefreshError;
use market_refresh::market::PriceRecord;
use market_refresh::store::lazy_pool;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn record(symbol: &str, price: Decimal, at: &str) -> PriceRecord {
    PriceRecord::new(ticker(symbol), price, utc(at)).unwrap()
}

#[tokio::test]
async fn test_cache_persists_across_pools() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_url(&dir, "cache.db");

    let writer = SqliteCacheWriter::new(lazy_pool(&url, true).unwrap(), "price_cache");
    let written = writer
        .upsert(&[
            record("AAPL", dec!(190.12), "2024-06-12T14:00:00Z"),
            record("MSFT", dec!(410.5), "2024-06-12T14:00:00Z"),
        ])
        .await
        .unwrap();
    assert_eq!(written, 2);

    let reader = SqliteCacheWriter::new(lazy_pool(&url, false).unwrap(), "price_cache");
    let entry = reader.get("MSFT").await.unwrap().unwrap();
    assert_eq!(entry.price, dec!(410.5));
    assert_eq!(entry.observed_at, utc("2024-06-12T14:00:00Z"));
}

#[tokio::test]
async fn test_duplicate_ticker_last_record_wins() {
    let writer = SqliteCacheWriter::new(lazy_pool("sqlite::memory:", true).unwrap(), "price_cache");

    let written = writer
        .upsert(&[
            record("AAPL", dec!(190), "2024-06-12T14:00:00Z"),
            record("AAPL", dec!(195), "2024-06-12T14:00:00Z"),
        ])
        .await
        .unwrap();

    assert_eq!(written, 1);
    let entries = writer.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].price, dec!(195));
}

#[tokio::test]
async fn test_stale_observation_does_not_overwrite() {
    let writer = SqliteCacheWriter::new(lazy_pool("sqlite::memory:", true).unwrap(), "price_cache");

    writer
        .upsert(&[record("AAPL", dec!(192), "2024-06-12T14:05:00Z")])
        .await
        .unwrap();
    let written = writer
        .upsert(&[
            record("AAPL", dec!(190), "2024-06-12T14:00:00Z"),
            record("MSFT", dec!(410), "2024-06-12T14:00:00Z"),
        ])
        .await
        .unwrap();

    assert_eq!(written, 1);
    assert_eq!(writer.get("AAPL").await.unwrap().unwrap().price, dec!(192));
    assert_eq!(writer.get("MSFT").await.unwrap().unwrap().price, dec!(410));
}

#[tokio::test]
async fn test_empty_batch_never_touches_store() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_url(&dir, "absent.db");
    let writer = SqliteCacheWriter::new(lazy_pool(&url, false).unwrap(), "price_cache");

    let written = tokio_test::assert_ok!(writer.upsert(&[]).await);
    assert_eq!(written, 0);
    assert!(!dir.path().join("absent.db").exists());
}

#[tokio::test]
async fn test_unreachable_store_fails_write() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_url(&dir, "absent.db");
    let writer = SqliteCacheWriter::new(lazy_pool(&url, false).unwrap(), "price_cache");

    let result = writer
        .upsert(&[record("AAPL", dec!(190), "2024-06-12T14:00:00Z")])
        .await;
    assert!(matches!(result, Err(RefreshError::WriteFailed(_))));
}
