//! Integration tests for market-refresh

mod cache_test;
mod refresh_test;
mod source_test;

use chrono::{DateTime, Utc};
use market_refresh::market::Ticker;
use std::collections::BTreeSet;

pub fn tickers(symbols: &[&str]) -> BTreeSet<Ticker> {
    symbols.iter().filter_map(|s| Ticker::new(s)).collect()
}

pub fn ticker(symbol: &str) -> Ticker {
    Ticker::new(symbol).unwrap()
}

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// SQLite URL for a file inside `dir`
pub fn sqlite_url(dir: &tempfile::TempDir, name: &str) -> String {
    format!("sqlite://{}", dir.path().join(name).display())
}
