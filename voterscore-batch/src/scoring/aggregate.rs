//! Cohort averages
//!
//! The mean is taken over per-voter scores that are already rounded to one
//! decimal, and only the final mean is rounded again.

use super::calculator::ScoreCalculator;
use crate::error::ScoringError;
use crate::models::VoterRecord;

/// What to average: voters to score first, or scores computed earlier
#[derive(Debug, Clone, Copy)]
pub enum CohortInput<'a> {
    Voters {
        voters: &'a [VoterRecord],
        calculator: &'a ScoreCalculator,
    },
    Scores(&'a [f64]),
}

/// Mean participation score of a cohort, or `None` for an empty cohort.
///
/// Fails only when a voter in a `Voters` cohort cannot be scored.
pub fn average(input: CohortInput<'_>) -> Result<Option<f64>, ScoringError> {
    match input {
        CohortInput::Scores(scores) => Ok(mean_of_tenths(scores.iter().copied())),
        CohortInput::Voters { voters, calculator } => {
            let scores = voters
                .iter()
                .map(|voter| calculator.score_record(voter))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(mean_of_tenths(scores))
        }
    }
}

/// Sum in tenths so halves like 7.05 land exactly on .5 before rounding
fn mean_of_tenths(scores: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum_tenths, count) = scores
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, n), score| (sum + score * 10.0, n + 1));
    if count == 0 {
        return None;
    }
    Some((sum_tenths / count as f64).round() / 10.0)
}
