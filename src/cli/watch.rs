//! Watch command implementation

use crate::config::Config;
use crate::error::RefreshError;
use crate::refresh::CycleReport;
use chrono::Utc;
use clap::Args;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between cycle starts (defaults to refresh.interval_secs)
    #[arg(short, long)]
    pub interval_secs: Option<u64>,

    /// Refresh even when the market is closed
    #[arg(short, long)]
    pub force: bool,
}

impl WatchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let orchestrator = super::build_orchestrator(config)?;
        let period = Duration::from_secs(
            self.interval_secs
                .unwrap_or(config.refresh.interval_secs)
                .max(1),
        );
        let force = self.force || config.refresh.force;
        let mut outages = OutageTracker::new(config.refresh.source_alert_threshold);

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = period.as_secs(), force, "Watching market data");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = orchestrator.run_cycle(Utc::now(), force).await;
                    if let Some(streak) = outages.observe(&report) {
                        tracing::error!(
                            consecutive_failures = streak,
                            "Ticker source unreachable across consecutive cycles; check store credentials"
                        );
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping watch loop");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Counts consecutive `SourceUnavailable` cycles
struct OutageTracker {
    threshold: u32,
    streak: u32,
}

impl OutageTracker {
    fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            streak: 0,
        }
    }

    /// Returns the streak length once it reaches the alert threshold
    fn observe(&mut self, report: &CycleReport) -> Option<u32> {
        match report.error() {
            Some(RefreshError::SourceUnavailable(_)) => {
                self.streak += 1;
                (self.streak >= self.threshold).then_some(self.streak)
            }
            // Other failures say nothing about the source
            Some(_) => None,
            None => {
                self.streak = 0;
                None
            }
        }
    }
}
