//! Batch score recomputation
//!
//! **Algorithm:**
//! 1. Fetch a page of `batch_size` voters in registration number order
//! 2. Empty page: done
//! 3. Score every record on the blocking pool; failures are logged, counted and excluded
//! 4. Persist the page's scores through the [`ScoreWriter`]
//! 5. Advance by the number of records fetched (not updated)
//! 6. Log running totals and repeat
//!
//! Pages are strictly sequential: a page is persisted before the next one is
//! fetched. Only a failed fetch (or cancellation) ends the run early; pages
//! already persisted stay committed.

use rayon::prelude::*;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::persistence::ScoreWriter;
use super::registry::{PageRequest, VoterSource};
use crate::error::{RunError, ScoringError};
use crate::models::{ScoredVoter, VoterRow};
use crate::scoring::ScoreCalculator;

/// Default page size
pub const DEFAULT_BATCH_SIZE: u32 = 5000;

/// Running totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Non-empty pages fetched
    pub pages: u64,
    /// Records fetched
    pub processed: u64,
    /// Records scored successfully
    pub scored: u64,
    /// Rows the store reported as updated
    pub updated: u64,
    /// Records excluded (validation + calculation failures)
    pub errored: u64,
    pub validation_errors: u64,
    pub calculation_errors: u64,
    /// Pages whose scores could not be written by any tier
    pub failed_pages: u64,
}

impl RunStats {
    /// Every fetched record was scored and every score was written
    pub fn is_clean(&self) -> bool {
        self.errored == 0 && self.failed_pages == 0 && self.updated == self.scored
    }

    fn record_errors(&mut self, errors: &[(String, ScoringError)]) {
        for (_, err) in errors {
            if err.is_validation() {
                self.validation_errors += 1;
            } else {
                self.calculation_errors += 1;
            }
        }
        self.errored += errors.len() as u64;
    }
}

/// Result of scoring one page
#[derive(Debug, Default)]
pub struct PageOutcome {
    pub scored: Vec<ScoredVoter>,
    /// (registration_number, error) for every excluded record
    pub errors: Vec<(String, ScoringError)>,
}

/// Where the next page starts
#[derive(Debug, Default)]
struct Cursor {
    offset: u64,
    last_seen: Option<String>,
}

impl Cursor {
    fn request(&self, limit: u32) -> PageRequest {
        PageRequest {
            after: self.last_seen.clone(),
            offset: self.offset,
            limit,
        }
    }

    fn advance(&mut self, page: &[VoterRow]) {
        self.offset += page.len() as u64;
        if let Some(last) = page.last() {
            self.last_seen = Some(last.registration_number.clone());
        }
    }
}

/// Score every record of a page; the calculator is stateless so records are
/// scored in parallel and collected back in page order
fn score_rows(calculator: &ScoreCalculator, page: &[VoterRow]) -> PageOutcome {
    let results: Vec<(&VoterRow, Result<f64, ScoringError>)> = page
        .par_iter()
        .map(|row| (row, calculator.score_row(row)))
        .collect();

    let mut outcome = PageOutcome::default();
    for (row, result) in results {
        match result {
            Ok(score) => outcome.scored.push(ScoredVoter {
                registration_number: row.registration_number.clone(),
                score,
            }),
            Err(err) => {
                let kind = if err.is_validation() { "validation" } else { "calculation" };
                warn!(
                    registration_number = %row.registration_number,
                    kind,
                    error = %err,
                    "Excluding record from this run"
                );
                outcome.errors.push((row.registration_number.clone(), err));
            }
        }
    }
    outcome
}

/// Recomputes and persists scores for the whole registry
pub struct BatchScoreUpdater<S, W> {
    source: S,
    writer: W,
    calculator: ScoreCalculator,
    batch_size: u32,
    cancel: CancellationToken,
}

impl<S, W> BatchScoreUpdater<S, W>
where
    S: VoterSource,
    W: ScoreWriter,
{
    pub fn new(source: S, writer: W, calculator: ScoreCalculator, batch_size: u32) -> Self {
        Self {
            source,
            writer,
            calculator,
            batch_size: batch_size.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between pages once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Score every record of a page
    pub fn score_page(&self, page: &[VoterRow]) -> PageOutcome {
        score_rows(&self.calculator, page)
    }

    /// Score a page on the blocking pool; the page is handed back with its outcome
    async fn score_page_blocking(
        &self,
        page: Vec<VoterRow>,
    ) -> Result<(Vec<VoterRow>, PageOutcome), tokio::task::JoinError> {
        tokio::task::spawn_blocking({
            let calculator = self.calculator.clone();
            move || {
                let outcome = score_rows(&calculator, &page);
                (page, outcome)
            }
        })
        .await
    }

    /// Run to completion
    pub async fn run(&self) -> Result<RunStats, RunError> {
        let mut stats = RunStats::default();
        let mut cursor = Cursor::default();

        info!(
            batch_size = self.batch_size,
            as_of = %self.calculator.normalizer().as_of(),
            "Starting participation score recomputation"
        );

        loop {
            if self.cancel.is_cancelled() {
                warn!(
                    processed = stats.processed,
                    updated = stats.updated,
                    "Cancellation requested, stopping before next page"
                );
                return Err(RunError::Cancelled { stats });
            }

            let request = cursor.request(self.batch_size);
            let page = match self.source.fetch_page(&request).await {
                Ok(page) => page,
                Err(source) => {
                    error!(
                        offset = cursor.offset,
                        error = %source,
                        "Failed to fetch voter page, aborting run"
                    );
                    return Err(RunError::Fetch {
                        offset: cursor.offset,
                        source,
                        stats,
                    });
                }
            };

            if page.is_empty() {
                break;
            }

            let (page, outcome) = match self.score_page_blocking(page).await {
                Ok(scored) => scored,
                Err(e) => {
                    error!(error = %e, "Scoring task failed, aborting run");
                    return Err(RunError::ScoringTask {
                        reason: e.to_string(),
                        stats,
                    });
                }
            };

            let updated = match self.writer.persist(&outcome.scored).await {
                Ok(updated) => updated,
                Err(e) => {
                    error!(
                        page = stats.pages + 1,
                        rows = outcome.scored.len(),
                        error = %e,
                        "Could not persist page scores"
                    );
                    stats.failed_pages += 1;
                    0
                }
            };

            cursor.advance(&page);

            stats.pages += 1;
            stats.processed += page.len() as u64;
            stats.scored += outcome.scored.len() as u64;
            stats.updated += updated;
            stats.record_errors(&outcome.errors);

            info!(
                page = stats.pages,
                fetched = page.len(),
                scored = outcome.scored.len(),
                errored = outcome.errors.len(),
                updated,
                total_processed = stats.processed,
                total_updated = stats.updated,
                total_errored = stats.errored,
                "Page complete"
            );
        }

        info!(
            pages = stats.pages,
            processed = stats.processed,
            updated = stats.updated,
            errored = stats.errored,
            "Participation score recomputation finished"
        );

        Ok(stats)
    }
}
