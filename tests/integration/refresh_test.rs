//! End-to-end refresh cycles against SQLite stores and a mock provider

use super::{sqlite_url, utc};
use market_refresh::cache::{CacheWriter, SqliteCacheWriter};
use market_refresh::cli::{build_orchestrator, open_cache};
use market_refresh::config::Config;
use market_refresh::error::RefreshError;
use market_refresh::refresh::{CycleOutcome, RefreshState};
use market_refresh::store::lazy_pool;
use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Wednesday 10:00 New York
const OPEN: &str = "2024-06-12T14:00:00Z";
/// Saturday 10:00 New York
const WEEKEND: &str = "2024-06-15T14:00:00Z";

async fn setup(server: &MockServer, symbols: &[&str]) -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.source.database_url = sqlite_url(&dir, "dashboard.db");
    config.cache.database_url = sqlite_url(&dir, "cache.db");
    config.provider.base_url = server.uri();
    config.provider.initial_backoff_ms = 10;
    config.validate().unwrap();

    let pool = lazy_pool(&config.source.database_url, true).unwrap();
    sqlx::query(&format!(
        "CREATE TABLE {} (symbol TEXT NOT NULL)",
        config.source.table
    ))
    .execute(&pool)
    .await
    .unwrap();
    for symbol in symbols {
        sqlx::query(&format!(
            "INSERT INTO {} (symbol) VALUES (?1)",
            config.source.table
        ))
        .bind(*symbol)
        .execute(&pool)
        .await
        .unwrap();
    }
    pool.close().await;

    (dir, config)
}

#[tokio::test]
async fn test_cycle_writes_usable_prices_and_skips_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/spark"))
        .and(query_param("symbols", "AAA,BBB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AAA": {"symbol": "AAA", "timestamp": [1718200800, 1718200860], "close": [9.75, 10.0]},
            "BBB": {"symbol": "BBB", "timestamp": [1718200800, 1718200860], "close": [null, null]},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = setup(&server, &["aaa", "BBB"]).await;
    let orchestrator = build_orchestrator(&config).unwrap();

    let report = orchestrator.run_cycle(utc(OPEN), false).await;

    assert!(report.is_success(), "outcome: {:?}", report.outcome);
    assert!(matches!(report.outcome, CycleOutcome::Completed));
    assert!(report.market_open);
    assert_eq!(report.tickers, 2);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.written, 1);
    assert_eq!(
        report.transitions,
        vec![
            RefreshState::Idle,
            RefreshState::CheckingMarket,
            RefreshState::LoadingTickers,
            RefreshState::Fetching,
            RefreshState::Writing,
            RefreshState::Done,
        ]
    );

    let cache = open_cache(&config).unwrap();
    let entries = cache.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].ticker, "AAA");
    assert_eq!(entries[0].price, dec!(10));
}

#[tokio::test]
async fn test_closed_market_skips_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, config) = setup(&server, &["AAA"]).await;
    let orchestrator = build_orchestrator(&config).unwrap();

    let report = orchestrator.run_cycle(utc(WEEKEND), false).await;

    assert!(report.is_success());
    assert!(matches!(report.outcome, CycleOutcome::MarketClosed));
    assert!(!report.market_open);
    assert_eq!(report.tickers, 0);
    assert_eq!(report.written, 0);
    assert_eq!(report.transitions.last(), Some(&RefreshState::Done));
}

#[tokio::test]
async fn test_forced_cycle_runs_on_weekend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/spark"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "AAA",
            "timestamp": [1718452800],
            "close": [11.25],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = setup(&server, &["AAA"]).await;
    let orchestrator = build_orchestrator(&config).unwrap();

    let report = orchestrator.run_cycle(utc(WEEKEND), true).await;

    assert!(report.is_success());
    assert!(report.forced);
    assert!(!report.market_open);
    assert_eq!(report.written, 1);
}

#[tokio::test]
async fn test_provider_failure_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let (_dir, config) = setup(&server, &["AAA"]).await;

    // Previously cached price
    let cache_pool = lazy_pool(&config.cache.database_url, true).unwrap();
    let seeded = SqliteCacheWriter::new(cache_pool, config.cache.table.clone());
    let earlier = market_refresh::market::PriceRecord::new(
        market_refresh::market::Ticker::new("AAA").unwrap(),
        dec!(9),
        utc("2024-06-11T20:00:00Z"),
    )
    .unwrap();
    seeded.upsert(&[earlier]).await.unwrap();

    let orchestrator = build_orchestrator(&config).unwrap();
    let report = orchestrator.run_cycle(utc(OPEN), false).await;

    assert!(!report.is_success());
    assert!(matches!(report.error(), Some(RefreshError::FetchFailed(_))));
    match &report.outcome {
        CycleOutcome::Failed { stage, .. } => assert_eq!(*stage, RefreshState::Fetching),
        other => panic!("unexpected outcome {:?}", other),
    }

    let entry = seeded.get("AAA").await.unwrap().unwrap();
    assert_eq!(entry.price, dec!(9));
}

#[tokio::test]
async fn test_missing_ticker_store_fails_cycle() {
    let server = MockServer::start().await;
    let (dir, mut config) = setup(&server, &[]).await;
    config.source.database_url = sqlite_url(&dir, "missing.db");

    let orchestrator = build_orchestrator(&config).unwrap();
    let report = orchestrator.run_cycle(utc(OPEN), false).await;

    assert!(matches!(
        report.error(),
        Some(RefreshError::SourceUnavailable(_))
    ));
    assert_eq!(report.written, 0);
}

#[tokio::test]
async fn test_empty_universe_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, config) = setup(&server, &[]).await;
    let orchestrator = build_orchestrator(&config).unwrap();
    let report = orchestrator.run_cycle(utc(OPEN), false).await;

    assert!(report.is_success());
    assert!(matches!(report.outcome, CycleOutcome::EmptyUniverse));
    assert_eq!(report.tickers, 0);
}
