//! Error types for voterscore-batch
//!
//! Record-level errors ([`ScoringError`]) and row/batch-level errors
//! ([`PersistenceError`]) are recovered by the pipeline and folded into run
//! statistics. Only [`RunError`] ends a run.

use thiserror::Error;

use crate::services::batch_updater::RunStats;

/// Failure to score a single voter record
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    /// Status is not exactly `Active` or `Inactive`
    #[error("invalid status '{0}': expected Active or Inactive")]
    InvalidStatus(String),

    /// History payload is not a JSON array
    #[error("history is not a list: {0}")]
    HistoryNotList(String),

    /// A history entry is missing fields or has the wrong shape
    #[error("malformed history event at index {index}: {reason}")]
    MalformedEvent { index: usize, reason: String },

    /// Election date fails strict YYYY-MM-DD format or calendar validity
    #[error("invalid election date '{0}'")]
    InvalidDate(String),

    /// Arithmetic produced a value that cannot be a score
    #[error("calculation failed: {0}")]
    Calculation(String),
}

impl ScoringError {
    /// Validation errors describe bad input; everything else is a calculation failure
    pub fn is_validation(&self) -> bool {
        !matches!(self, ScoringError::Calculation(_))
    }
}

/// Failure while writing scores back to the registry
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The single multi-row statement failed
    #[error("bulk update failed: {0}")]
    Bulk(#[source] sqlx::Error),

    /// The bulk statement exceeded its time budget
    #[error("bulk update timed out after {0} ms")]
    Timeout(u64),

    /// Could not open or commit the per-row transaction
    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    /// Batch could not be encoded as a statement parameter
    #[error("could not encode batch: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Run-level failure: the whole run stops
#[derive(Debug, Error)]
pub enum RunError {
    /// Fetching the next page failed; batches already persisted stay committed
    #[error("failed to fetch page at offset {offset}: {source}")]
    Fetch {
        offset: u64,
        #[source]
        source: voterscore_common::Error,
        stats: RunStats,
    },

    /// Cancellation was requested between pages
    #[error("run cancelled")]
    Cancelled { stats: RunStats },

    /// The blocking task scoring a page panicked or was aborted
    #[error("scoring task failed: {reason}")]
    ScoringTask { reason: String, stats: RunStats },
}

impl RunError {
    /// Statistics accumulated before the run stopped
    pub fn stats(&self) -> &RunStats {
        match self {
            RunError::Fetch { stats, .. }
            | RunError::Cancelled { stats }
            | RunError::ScoringTask { stats, .. } => stats,
        }
    }
}
