//! Run command implementation

use crate::config::Config;
use chrono::Utc;
use clap::Args;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Refresh even when the market is closed
    #[arg(short, long)]
    pub force: bool,
}

impl RunArgs {
    /// Run one cycle; errors iff the cycle reported failure
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let orchestrator = super::build_orchestrator(config)?;
        let report = orchestrator
            .run_cycle(Utc::now(), self.force || config.refresh.force)
            .await;

        match report.error() {
            Some(error) => anyhow::bail!("Refresh cycle {} failed: {}", report.cycle_id, error),
            None => Ok(()),
        }
    }
}
