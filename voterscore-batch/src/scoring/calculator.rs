//! Participation score calculation
//!
//! **Algorithm:**
//! 1. Base points from registration status
//! 2. Sort history most recent first
//! 3. Recency points from whole years since the most recent vote
//! 4. Frequency points from the event count (saturating)
//! 5. Diversity multiplier on frequency points if any event is non-general
//! 6. raw = base + recency + frequency * multiplier
//! 7. Inactive voters are capped at `max_score_inactive`
//! 8. Clamp to [`min_score`, `max_score`] and round to one decimal
//!
//! Pure: the evaluation date is fixed at construction, so the same input
//! always yields the same score.

use chrono::NaiveDate;

use super::config::ScoringConfig;
use super::history::{HistoryNormalizer, NormalizedHistory};
use super::round_to_tenth;
use crate::error::ScoringError;
use crate::models::{HistoryEvent, VoterRecord, VoterRow, VoterStatus};

/// Every intermediate value of one score computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub base_points: f64,
    pub recency_points: f64,
    pub frequency_points: f64,
    pub diversity_multiplier: f64,
    pub raw_score: f64,
    pub final_score: f64,
}

/// Stateless scorer bound to a tuning and an evaluation date
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    config: ScoringConfig,
    normalizer: HistoryNormalizer,
}

impl ScoreCalculator {
    /// Create a calculator; `config` is expected to have passed [`ScoringConfig::validate`]
    pub fn new(config: ScoringConfig, as_of: NaiveDate) -> Self {
        let normalizer = HistoryNormalizer::new(as_of, config.lookback_years);
        Self { config, normalizer }
    }

    pub fn normalizer(&self) -> &HistoryNormalizer {
        &self.normalizer
    }

    /// Score a validated status and history
    pub fn score(&self, status: VoterStatus, history: &[HistoryEvent]) -> Result<f64, ScoringError> {
        self.breakdown(status, history).map(|b| b.final_score)
    }

    /// Score a validated voter record
    pub fn score_record(&self, record: &VoterRecord) -> Result<f64, ScoringError> {
        self.score(record.status, &record.history)
    }

    /// Validate a stored row and score it
    pub fn score_row(&self, row: &VoterRow) -> Result<f64, ScoringError> {
        let record = self.validate_row(row)?;
        self.score_record(&record)
    }

    /// Validate status and history of a stored row
    pub fn validate_row(&self, row: &VoterRow) -> Result<VoterRecord, ScoringError> {
        let status: VoterStatus = row.status.parse()?;
        let history = self.normalizer.parse(&row.history)?;
        Ok(VoterRecord {
            registration_number: row.registration_number.clone(),
            status,
            history,
        })
    }

    /// Compute the score and all of its components
    pub fn breakdown(
        &self,
        status: VoterStatus,
        history: &[HistoryEvent],
    ) -> Result<ScoreBreakdown, ScoringError> {
        let history = self.normalizer.normalize(history.to_vec());
        self.breakdown_normalized(status, &history)
    }

    fn breakdown_normalized(
        &self,
        status: VoterStatus,
        history: &NormalizedHistory,
    ) -> Result<ScoreBreakdown, ScoringError> {
        let config = &self.config;

        let base_points = match status {
            VoterStatus::Active => config.base_points_active,
            VoterStatus::Inactive => config.base_points_inactive,
        };

        let years = history
            .most_recent()
            .map(|event| self.normalizer.years_since(event.election_date));
        let recency_points = config.recency_points(years);

        let frequency_points = config.frequency.points(history.len());

        let diversity_multiplier = if history.has_non_general() {
            config.diversity_multiplier
        } else {
            1.0
        };

        let raw_score = base_points + recency_points + frequency_points * diversity_multiplier;
        if !raw_score.is_finite() {
            return Err(ScoringError::Calculation(format!(
                "non-finite raw score {} (base {}, recency {}, frequency {} x {})",
                raw_score, base_points, recency_points, frequency_points, diversity_multiplier
            )));
        }

        let capped = match status {
            VoterStatus::Inactive => raw_score.min(config.max_score_inactive),
            VoterStatus::Active => raw_score,
        };
        let final_score = round_to_tenth(capped.clamp(config.min_score, config.max_score));

        Ok(ScoreBreakdown {
            base_points,
            recency_points,
            frequency_points,
            diversity_multiplier,
            raw_score,
            final_score,
        })
    }
}
