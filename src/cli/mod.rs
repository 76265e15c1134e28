//! CLI interface for market-refresh
//!
//! Provides subcommands for:
//! - `run`: One refresh cycle (default)
//! - `watch`: Refresh on a fixed interval
//! - `status`: Show market hours and cache state
//! - `config`: Show effective configuration

mod run;
mod watch;

pub use run::RunArgs;
pub use watch::WatchArgs;

use crate::cache::SqliteCacheWriter;
use crate::config::Config;
use crate::fetch::SparkClient;
use crate::market::MarketClock;
use crate::refresh::RefreshOrchestrator;
use crate::source::SqliteTickerSource;
use crate::store::lazy_pool;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "market-refresh")]
#[command(about = "Refresh the dashboard price cache from the quote provider")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "MARKET_REFRESH_CONFIG")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single refresh cycle
    Run(RunArgs),
    /// Run refresh cycles on a fixed interval
    Watch(WatchArgs),
    /// Show market hours and cache state
    Status,
    /// Show effective configuration
    Config,
}

/// Wire the SQLite stores and quote client into an orchestrator
///
/// Pools connect lazily, so store outages surface inside the cycle as
/// `SourceUnavailable` / `WriteFailed` rather than here.
pub fn build_orchestrator(config: &Config) -> anyhow::Result<RefreshOrchestrator> {
    let clock = MarketClock::new(config.market.window()?);

    let source_pool = lazy_pool(&config.source.database_url, false)?;
    let source = SqliteTickerSource::new(source_pool, config.source.table.clone());

    let cache_pool = lazy_pool(&config.cache.database_url, true)?;
    let writer = SqliteCacheWriter::new(cache_pool, config.cache.table.clone());

    let fetcher = SparkClient::new(config.provider.spark_config())?;

    Ok(RefreshOrchestrator::new(
        clock,
        Arc::new(source),
        Arc::new(fetcher),
        Arc::new(writer),
    ))
}

/// Open the configured price cache for read-only inspection
pub fn open_cache(config: &Config) -> anyhow::Result<SqliteCacheWriter> {
    let pool = lazy_pool(&config.cache.database_url, false)?;
    Ok(SqliteCacheWriter::new(pool, config.cache.table.clone()))
}
