//! Scoring tunables
//!
//! Every constant the calculator uses lives here so alternate tunings can be
//! loaded from the `[scoring]` table of the config file or built in tests.

use serde::{Deserialize, Serialize};
use voterscore_common::{Error, Result};

/// One step of the recency function: votes at most `max_years` old earn `points`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyBracket {
    pub max_years: u32,
    pub points: f64,
}

/// Shape of the frequency contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyCurve {
    /// `scale * ln(n + 1)`, capped at `max_points`
    #[default]
    Logarithmic,
    /// `scale * n`, capped at `max_points`
    Linear,
}

/// Frequency points configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    pub curve: FrequencyCurve,
    pub scale: f64,
    pub max_points: f64,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            curve: FrequencyCurve::Logarithmic,
            scale: 1.5,
            max_points: 3.0,
        }
    }
}

impl FrequencyConfig {
    /// Frequency points for `count` qualifying events (before the diversity multiplier)
    pub fn points(&self, count: usize) -> f64 {
        let n = count as f64;
        let uncapped = match self.curve {
            FrequencyCurve::Logarithmic => self.scale * (n + 1.0).ln(),
            FrequencyCurve::Linear => self.scale * n,
        };
        uncapped.min(self.max_points)
    }
}

/// All scoring constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_points_active: f64,
    pub base_points_inactive: f64,
    /// Ascending by `max_years`; older votes than the last bracket earn nothing
    pub recency: Vec<RecencyBracket>,
    pub frequency: FrequencyConfig,
    /// Applied to frequency points when any event is non-general
    pub diversity_multiplier: f64,
    pub max_score_inactive: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Drop events older than this many whole years; `None` keeps everything
    pub lookback_years: Option<u32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_points_active: 2.0,
            base_points_inactive: 1.0,
            recency: vec![
                RecencyBracket { max_years: 2, points: 4.0 },
                RecencyBracket { max_years: 5, points: 2.0 },
                RecencyBracket { max_years: 8, points: 1.0 },
            ],
            frequency: FrequencyConfig::default(),
            diversity_multiplier: 1.5,
            max_score_inactive: 4.9,
            min_score: 1.0,
            max_score: 10.0,
            lookback_years: None,
        }
    }
}

impl ScoringConfig {
    /// Recency points for a most-recent vote `years` whole years ago
    pub fn recency_points(&self, years: Option<u32>) -> f64 {
        let Some(years) = years else {
            return 0.0;
        };
        self.recency
            .iter()
            .find(|bracket| years <= bracket.max_years)
            .map(|bracket| bracket.points)
            .unwrap_or(0.0)
    }

    /// Reject tunings that would break the score range invariants
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.base_points_active,
            self.base_points_inactive,
            self.frequency.scale,
            self.frequency.max_points,
            self.diversity_multiplier,
            self.max_score_inactive,
            self.min_score,
            self.max_score,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(Error::Config("scoring constants must be finite".to_string()));
        }

        if self.min_score >= self.max_score {
            return Err(Error::Config(format!(
                "min_score ({}) must be below max_score ({})",
                self.min_score, self.max_score
            )));
        }

        if self.max_score_inactive < self.min_score || self.max_score_inactive > self.max_score {
            return Err(Error::Config(format!(
                "max_score_inactive ({}) must lie within [{}, {}]",
                self.max_score_inactive, self.min_score, self.max_score
            )));
        }

        if self.diversity_multiplier < 1.0 {
            return Err(Error::Config(format!(
                "diversity_multiplier ({}) must be at least 1.0",
                self.diversity_multiplier
            )));
        }

        if self.frequency.scale <= 0.0 || self.frequency.max_points <= 0.0 {
            return Err(Error::Config(
                "frequency scale and max_points must be positive".to_string(),
            ));
        }

        if self.recency.is_empty() {
            return Err(Error::Config("at least one recency bracket is required".to_string()));
        }

        for pair in self.recency.windows(2) {
            if pair[1].max_years <= pair[0].max_years {
                return Err(Error::Config(
                    "recency brackets must be strictly ascending by max_years".to_string(),
                ));
            }
            // Older votes must never earn more than newer ones
            if pair[1].points > pair[0].points {
                return Err(Error::Config(
                    "recency points must not increase with age".to_string(),
                ));
            }
        }

        if self.recency.iter().any(|b| !b.points.is_finite() || b.points < 0.0) {
            return Err(Error::Config("recency points must be non-negative".to_string()));
        }

        Ok(())
    }
}
