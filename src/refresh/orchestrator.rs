//! Refresh cycle orchestration
//!
//! One cycle: market check, load universe, batched fetch, cache upsert.
//! Collaborators are injected so each stage can be replaced in tests.

use super::types::{CycleOutcome, CycleReport, RefreshState};
use crate::cache::CacheWriter;
use crate::fetch::BatchPriceFetcher;
use crate::market::{MarketClock, PriceRecord, Ticker};
use crate::source::TickerSource;
use crate::telemetry::{
    increment_counter, record_cycle_outcome, record_latency, set_gauge, CounterMetric,
    GaugeMetric, LatencyMetric,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Runs refresh cycles against injected collaborators
pub struct RefreshOrchestrator {
    clock: MarketClock,
    source: Arc<dyn TickerSource>,
    fetcher: Arc<dyn BatchPriceFetcher>,
    writer: Arc<dyn CacheWriter>,
}

impl RefreshOrchestrator {
    pub fn new(
        clock: MarketClock,
        source: Arc<dyn TickerSource>,
        fetcher: Arc<dyn BatchPriceFetcher>,
        writer: Arc<dyn CacheWriter>,
    ) -> Self {
        Self {
            clock,
            source,
            fetcher,
            writer,
        }
    }

    pub fn clock(&self) -> &MarketClock {
        &self.clock
    }

    /// Run one cycle as of `now`
    ///
    /// `force` bypasses the market-hours check. Never returns an error: the
    /// report carries the outcome, including failures.
    pub async fn run_cycle(&self, now: DateTime<Utc>, force: bool) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("refresh_cycle", %cycle_id);
        self.run_cycle_inner(cycle_id, now, force)
            .instrument(span)
            .await
    }

    async fn run_cycle_inner(&self, cycle_id: Uuid, now: DateTime<Utc>, force: bool) -> CycleReport {
        let mut cycle = Cycle::new(cycle_id, force);

        cycle.enter(RefreshState::CheckingMarket);
        cycle.report.market_open = self.clock.is_active(now);
        set_gauge(
            GaugeMetric::MarketOpen,
            if cycle.report.market_open { 1.0 } else { 0.0 },
        );
        if !cycle.report.market_open && !force {
            return cycle.finish(CycleOutcome::MarketClosed);
        }

        cycle.enter(RefreshState::LoadingTickers);
        let tickers = match self.source.list_tickers().await {
            Ok(tickers) => tickers,
            Err(error) => {
                return cycle.finish(CycleOutcome::Failed {
                    stage: RefreshState::LoadingTickers,
                    error,
                })
            }
        };
        cycle.report.tickers = tickers.len();
        set_gauge(GaugeMetric::UniverseSize, tickers.len() as f64);
        if tickers.is_empty() {
            return cycle.finish(CycleOutcome::EmptyUniverse);
        }

        cycle.enter(RefreshState::Fetching);
        let prices = match self.fetcher.fetch(&tickers).await {
            Ok(prices) => prices,
            Err(error) => {
                return cycle.finish(CycleOutcome::Failed {
                    stage: RefreshState::Fetching,
                    error,
                })
            }
        };

        let records: Vec<PriceRecord> = prices
            .into_values()
            .filter(|record| tickers.contains(record.ticker()))
            .collect();
        let resolved: BTreeSet<&Ticker> = records.iter().map(PriceRecord::ticker).collect();
        cycle.report.fetched = resolved.len();
        cycle.report.skipped = tickers.len() - resolved.len();
        if cycle.report.skipped > 0 && tracing::enabled!(tracing::Level::DEBUG) {
            let missing: Vec<&str> = tickers
                .iter()
                .filter(|t| !resolved.contains(t))
                .map(Ticker::as_str)
                .collect();
            tracing::debug!(?missing, "Tickers without a usable price");
        }

        cycle.enter(RefreshState::Writing);
        cycle.report.attempted = records.len();
        match self.writer.upsert(&records).await {
            Ok(written) => {
                cycle.report.written = written;
                cycle.finish(CycleOutcome::Completed)
            }
            Err(error) => cycle.finish(CycleOutcome::Failed {
                stage: RefreshState::Writing,
                error,
            }),
        }
    }
}

/// In-flight cycle bookkeeping
struct Cycle {
    started: Instant,
    report: CycleReport,
}

impl Cycle {
    fn new(cycle_id: Uuid, forced: bool) -> Self {
        Self {
            started: Instant::now(),
            report: CycleReport {
                cycle_id,
                forced,
                market_open: false,
                tickers: 0,
                fetched: 0,
                skipped: 0,
                attempted: 0,
                written: 0,
                transitions: vec![RefreshState::Idle],
                outcome: CycleOutcome::Completed,
            },
        }
    }

    fn enter(&mut self, state: RefreshState) {
        tracing::trace!(state = %state, "Entering state");
        self.report.transitions.push(state);
    }

    /// Move to `Done`, emit the one-line summary and metrics
    fn finish(mut self, outcome: CycleOutcome) -> CycleReport {
        self.enter(RefreshState::Done);
        self.report.outcome = outcome;

        let report = &self.report;
        record_latency(LatencyMetric::Cycle, self.started.elapsed());
        record_cycle_outcome(report.outcome.label());
        increment_counter(CounterMetric::TickersWritten, report.written as u64);
        increment_counter(CounterMetric::TickersSkipped, report.skipped as u64);

        match &report.outcome {
            CycleOutcome::Failed { stage, error } => tracing::error!(
                market_open = report.market_open,
                forced = report.forced,
                tickers = report.tickers,
                fetched = report.fetched,
                skipped = report.skipped,
                attempted = report.attempted,
                written = report.written,
                stage = %stage,
                error = %error,
                "Refresh cycle failed"
            ),
            outcome => tracing::info!(
                market_open = report.market_open,
                forced = report.forced,
                tickers = report.tickers,
                fetched = report.fetched,
                skipped = report.skipped,
                written = report.written,
                outcome = outcome.label(),
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "Refresh cycle finished"
            ),
        }

        self.report
    }
}
