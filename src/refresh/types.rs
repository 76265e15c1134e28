//! Refresh cycle types

use crate::error::RefreshError;
use std::fmt;
use uuid::Uuid;

/// Stages a refresh cycle moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    CheckingMarket,
    LoadingTickers,
    Fetching,
    Writing,
    Done,
}

impl RefreshState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CheckingMarket => "checking_market",
            Self::LoadingTickers => "loading_tickers",
            Self::Fetching => "fetching",
            Self::Writing => "writing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a cycle ended
#[derive(Debug)]
pub enum CycleOutcome {
    /// Prices were fetched and written
    Completed,
    /// Market closed and the cycle was not forced
    MarketClosed,
    /// The ticker store had no rows
    EmptyUniverse,
    /// A collaborator failed in `stage`
    Failed {
        stage: RefreshState,
        error: RefreshError,
    },
}

impl CycleOutcome {
    /// Closed markets and empty universes count as success
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::MarketClosed => "market_closed",
            Self::EmptyUniverse => "empty_universe",
            Self::Failed { error, .. } => error.kind(),
        }
    }
}

/// Summary of one refresh cycle
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Market-hours check was bypassed
    pub forced: bool,
    pub market_open: bool,
    /// Size of the ticker universe
    pub tickers: usize,
    /// Tickers with a usable price
    pub fetched: usize,
    /// Universe tickers without a usable price
    pub skipped: usize,
    /// Records handed to the cache writer
    pub attempted: usize,
    /// Rows the cache writer reported written
    pub written: usize,
    /// States entered, in order, ending with `Done`
    pub transitions: Vec<RefreshState>,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// The error behind a failed cycle
    pub fn error(&self) -> Option<&RefreshError> {
        match &self.outcome {
            CycleOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
