//! Participation scoring: tunables, history normalization, the calculator
//! and cohort averages.

pub mod aggregate;
pub mod calculator;
pub mod config;
pub mod history;

pub use aggregate::{average, CohortInput};
pub use calculator::{ScoreBreakdown, ScoreCalculator};
pub use config::{FrequencyConfig, FrequencyCurve, RecencyBracket, ScoringConfig};
pub use history::{classify_election_type, parse_election_date, HistoryNormalizer, NormalizedHistory};

/// Round to one decimal place, halves away from zero
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
