//! Refresh pipeline
//!
//! Composes the market clock, ticker source, batched fetcher and cache
//! writer into independent refresh cycles.

mod orchestrator;
mod types;

pub use orchestrator::RefreshOrchestrator;
pub use types::{CycleOutcome, CycleReport, RefreshState};
