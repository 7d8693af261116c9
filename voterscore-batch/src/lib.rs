//! voterscore-batch library
//!
//! Participation scoring and the batch job that recomputes scores for the
//! whole voter registry:
//! - [`scoring`]: tunables, history normalization, the calculator, cohort averages
//! - [`services`]: registry reads, score persistence, the batch pipeline

pub mod config;
pub mod error;
pub mod models;
pub mod scoring;
pub mod services;

pub use error::{PersistenceError, RunError, ScoringError};
pub use models::{ElectionClass, HistoryEvent, ScoredVoter, VoterRecord, VoterStatus};
pub use scoring::{ScoreCalculator, ScoringConfig};
pub use services::{BatchScoreUpdater, RunStats};
