//! Prometheus metrics

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Batched upstream quote fetch
    Fetch,
    /// Whole refresh cycle
    Cycle,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Tickers in the current universe
    UniverseSize,
    /// Whether the market was open at the last cycle (0/1)
    MarketOpen,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Rows written to the price cache
    TickersWritten,
    /// Universe tickers with no usable price
    TickersSkipped,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Fetch => "market_refresh_fetch_latency_ms",
        LatencyMetric::Cycle => "market_refresh_cycle_latency_ms",
    };

    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::UniverseSize => "market_refresh_universe_size",
        GaugeMetric::MarketOpen => "market_refresh_market_open",
    };

    metrics::gauge!(metric_name).set(value);
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, value: u64) {
    let metric_name = match metric {
        CounterMetric::TickersWritten => "market_refresh_tickers_written_total",
        CounterMetric::TickersSkipped => "market_refresh_tickers_skipped_total",
    };

    metrics::counter!(metric_name).increment(value);
}

/// Count a finished cycle by outcome label
pub fn record_cycle_outcome(outcome: &'static str) {
    metrics::counter!("market_refresh_cycles_total", "outcome" => outcome).increment(1);
}

/// Serve `/metrics` on the given port
///
/// Must be called from within a Tokio runtime.
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
