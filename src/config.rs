//! Configuration types for market-refresh

use crate::fetch::{SparkConfig, DEFAULT_PROVIDER_URL};
use crate::market::MarketWindow;
use crate::store::is_valid_table_name;
use crate::telemetry::LogFormat;
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding both store URLs
pub const ENV_DATABASE_URL: &str = "MARKET_REFRESH_DATABASE_URL";
/// Environment variable overriding the ticker store URL
pub const ENV_TICKER_DB_URL: &str = "MARKET_REFRESH_TICKER_DB_URL";
/// Environment variable overriding the price cache URL
pub const ENV_CACHE_DB_URL: &str = "MARKET_REFRESH_CACHE_DB_URL";
/// Environment variable carrying the quote provider API key
pub const ENV_PROVIDER_API_KEY: &str = "QUOTE_PROVIDER_API_KEY";
/// Environment variable overriding the quote provider base URL
pub const ENV_PROVIDER_URL: &str = "QUOTE_PROVIDER_URL";
/// Environment variable forcing refreshes outside market hours
pub const ENV_FORCE: &str = "MARKET_REFRESH_FORCE";

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid time zone: {0}")]
    InvalidTimeZone(String),
    #[error("Invalid {field}: {value} (expected HH:MM or HH:MM:SS)")]
    InvalidTime { field: &'static str, value: String },
    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),
    #[error("Market window closes before it opens")]
    InvertedWindow,
    #[error("Every weekday is marked closed")]
    NoTradingDays,
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Trading window configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Session open, local exchange time
    pub open_time: String,
    /// Session close, local exchange time
    pub close_time: String,
    /// IANA time zone of the exchange
    pub time_zone: String,
    /// Weekdays without a session (e.g., "Sat")
    pub closed_weekdays: Vec<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            open_time: "09:30".to_string(),
            close_time: "16:00".to_string(),
            time_zone: "America/New_York".to_string(),
            closed_weekdays: vec!["Sat".to_string(), "Sun".to_string()],
        }
    }
}

/// Ticker store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub database_url: String,
    pub table: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/dashboard.db".to_string(),
            table: "tracked_tickers".to_string(),
        }
    }
}

/// Upstream quote provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Lookback period
    pub range: String,
    /// Sampling interval
    pub interval: String,
    pub timeout_secs: u64,
    pub max_batch_size: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            api_key: None,
            range: "1d".to_string(),
            interval: "1m".to_string(),
            timeout_secs: 20,
            max_batch_size: 500,
            max_retries: 2,
            initial_backoff_ms: 500,
        }
    }
}

/// Price cache store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub database_url: String,
    pub table: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/dashboard.db".to_string(),
            table: "price_cache".to_string(),
        }
    }
}

/// Cycle scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Period of the `watch` loop
    pub interval_secs: u64,
    /// Skip the market-hours check on every cycle
    pub force: bool,
    /// Consecutive source outages before an operator alert is logged
    pub source_alert_threshold: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            force: false,
            source_alert_threshold: 3,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Serve Prometheus metrics on this port when set
    pub metrics_port: Option<u16>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl MarketConfig {
    /// Parse into a validated trading window
    pub fn window(&self) -> Result<MarketWindow, ConfigError> {
        let open_time = parse_time("open_time", &self.open_time)?;
        let close_time = parse_time("close_time", &self.close_time)?;
        if close_time < open_time {
            return Err(ConfigError::InvertedWindow);
        }

        let time_zone: Tz = self
            .time_zone
            .parse()
            .map_err(|_| ConfigError::InvalidTimeZone(self.time_zone.clone()))?;

        let mut closed_weekdays = Vec::new();
        for day in &self.closed_weekdays {
            let weekday: Weekday = day
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidWeekday(day.clone()))?;
            if !closed_weekdays.contains(&weekday) {
                closed_weekdays.push(weekday);
            }
        }
        if closed_weekdays.len() >= 7 {
            return Err(ConfigError::NoTradingDays);
        }

        Ok(MarketWindow {
            open_time,
            close_time,
            time_zone,
            closed_weekdays,
        })
    }
}

impl ProviderConfig {
    pub fn spark_config(&self) -> SparkConfig {
        SparkConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            range: self.range.clone(),
            interval: self.interval.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_batch_size: self.max_batch_size,
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ConfigError::InvalidTime {
            field,
            value: value.to_string(),
        })
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.source.database_url = url.clone();
            self.cache.database_url = url;
        }
        if let Some(url) = lookup(ENV_TICKER_DB_URL) {
            self.source.database_url = url;
        }
        if let Some(url) = lookup(ENV_CACHE_DB_URL) {
            self.cache.database_url = url;
        }
        if let Some(key) = lookup(ENV_PROVIDER_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_PROVIDER_URL) {
            self.provider.base_url = url;
        }
        if let Some(force) = lookup(ENV_FORCE) {
            self.refresh.force = matches!(
                force.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Check every value the pipeline depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.market.window()?;

        for table in [&self.source.table, &self.cache.table] {
            if !is_valid_table_name(table) {
                return Err(ConfigError::InvalidTableName(table.clone()));
            }
        }

        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::NotPositive("provider.timeout_secs"));
        }
        if self.provider.max_batch_size == 0 {
            return Err(ConfigError::NotPositive("provider.max_batch_size"));
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::NotPositive("refresh.interval_secs"));
        }

        Ok(())
    }
}
