//! Refresh pipeline errors

use thiserror::Error;

/// Failure kinds surfaced by the refresh collaborators
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Ticker store could not be reached or queried
    #[error("Ticker source unavailable: {0}")]
    SourceUnavailable(String),
    /// Upstream quote provider failed, timed out, or returned garbage
    #[error("Price fetch failed: {0}")]
    FetchFailed(String),
    /// Price cache store rejected the batch
    #[error("Cache write failed: {0}")]
    WriteFailed(String),
}

impl RefreshError {
    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RefreshError::SourceUnavailable(_) => "source_unavailable",
            RefreshError::FetchFailed(_) => "fetch_failed",
            RefreshError::WriteFailed(_) => "write_failed",
        }
    }
}
