//! Score persistence
//!
//! Two tiers behind one [`ScoreWriter`] interface:
//! - [`BulkScoreWriter`]: one `UPDATE ... FROM json_each(?)` statement per page
//! - [`RowScoreWriter`]: one transaction, one savepoint per row; failing rows
//!   are logged and skipped and the rest commit
//!
//! [`FallbackScoreWriter`] runs the first and, on any failure, the second.
//! All values reach SQL as bound parameters; the bulk tier passes the whole
//! page as a single JSON array parameter.

use sqlx::{Sqlite, SqlitePool, Transaction};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::models::ScoredVoter;

/// Writes one page of computed scores
pub trait ScoreWriter: Send + Sync {
    /// Persist `batch` and return the number of rows actually updated
    fn persist(&self, batch: &[ScoredVoter]) -> impl Future<Output = Result<u64, PersistenceError>> + Send;
}

const BULK_UPDATE_SQL: &str = r#"
    UPDATE voters
       SET participation_score = batch.score,
           score_updated_at = ?
      FROM (SELECT json_extract(value, '$[0]') AS registration_number,
                   json_extract(value, '$[1]') AS score
              FROM json_each(?)) AS batch
     WHERE voters.registration_number = batch.registration_number
"#;

const ROW_UPDATE_SQL: &str = r#"
    UPDATE voters
       SET participation_score = ?,
           score_updated_at = ?
     WHERE registration_number = ?
"#;

fn update_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Encode a page as `[[registration_number, score], ...]`
fn encode_batch(batch: &[ScoredVoter]) -> Result<String, serde_json::Error> {
    let pairs: Vec<(&str, f64)> = batch
        .iter()
        .map(|s| (s.registration_number.as_str(), s.score))
        .collect();
    serde_json::to_string(&pairs)
}

/// Single-statement multi-row update
#[derive(Debug, Clone)]
pub struct BulkScoreWriter {
    db: SqlitePool,
    timeout: Duration,
}

impl BulkScoreWriter {
    pub fn new(db: SqlitePool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

impl ScoreWriter for BulkScoreWriter {
    async fn persist(&self, batch: &[ScoredVoter]) -> Result<u64, PersistenceError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let payload = encode_batch(batch)?;
        let stamp = update_stamp();
        let statement = sqlx::query(BULK_UPDATE_SQL)
            .bind(&stamp)
            .bind(&payload)
            .execute(&self.db);

        let result = tokio::time::timeout(self.timeout, statement)
            .await
            .map_err(|_| PersistenceError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(PersistenceError::Bulk)?;

        debug!(
            rows = batch.len(),
            updated = result.rows_affected(),
            "Bulk score update complete"
        );

        Ok(result.rows_affected())
    }
}

/// Per-row updates inside one transaction
#[derive(Debug, Clone)]
pub struct RowScoreWriter {
    db: SqlitePool,
}

impl RowScoreWriter {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Update one row inside its own savepoint so a failure leaves the
    /// enclosing transaction usable
    async fn update_row(
        tx: &mut Transaction<'_, Sqlite>,
        scored: &ScoredVoter,
        stamp: &str,
    ) -> Result<u64, sqlx::Error> {
        let mut savepoint = sqlx::Connection::begin(&mut **tx).await?;

        let outcome = sqlx::query(ROW_UPDATE_SQL)
            .bind(scored.score)
            .bind(stamp)
            .bind(&scored.registration_number)
            .execute(&mut *savepoint)
            .await;

        match outcome {
            Ok(result) => {
                savepoint.commit().await?;
                Ok(result.rows_affected())
            }
            Err(e) => {
                if let Err(rollback_err) = savepoint.rollback().await {
                    warn!(
                        registration_number = %scored.registration_number,
                        error = %rollback_err,
                        "Failed to roll back savepoint"
                    );
                }
                Err(e)
            }
        }
    }
}

impl ScoreWriter for RowScoreWriter {
    async fn persist(&self, batch: &[ScoredVoter]) -> Result<u64, PersistenceError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let stamp = update_stamp();
        // Dropping `tx` on any early return rolls it back
        let mut tx = self.db.begin().await.map_err(PersistenceError::Transaction)?;

        let mut updated = 0u64;
        let mut skipped = 0usize;
        for scored in batch {
            match Self::update_row(&mut tx, scored, &stamp).await {
                Ok(rows) => updated += rows,
                Err(e) => {
                    skipped += 1;
                    warn!(
                        registration_number = %scored.registration_number,
                        error = %e,
                        "Score update failed for row, skipping"
                    );
                }
            }
        }

        tx.commit().await.map_err(PersistenceError::Transaction)?;

        debug!(
            rows = batch.len(),
            updated,
            skipped,
            "Per-row score update complete"
        );

        Ok(updated)
    }
}

/// Try `primary`; if it fails for any reason, run `fallback` on the same batch
#[derive(Debug, Clone)]
pub struct FallbackScoreWriter<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackScoreWriter<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl FallbackScoreWriter<BulkScoreWriter, RowScoreWriter> {
    /// Bulk update with per-row fallback against one pool
    pub fn sqlite(db: SqlitePool, bulk_timeout: Duration) -> Self {
        Self::new(BulkScoreWriter::new(db.clone(), bulk_timeout), RowScoreWriter::new(db))
    }
}

impl<P, F> ScoreWriter for FallbackScoreWriter<P, F>
where
    P: ScoreWriter,
    F: ScoreWriter,
{
    async fn persist(&self, batch: &[ScoredVoter]) -> Result<u64, PersistenceError> {
        match self.primary.persist(batch).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                warn!(
                    rows = batch.len(),
                    error = %e,
                    "Bulk score update failed, falling back to per-row updates"
                );
                self.fallback.persist(batch).await
            }
        }
    }
}

/// Writes nothing and reports zero updated rows; used for `--dry-run`
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunWriter;

impl ScoreWriter for DryRunWriter {
    async fn persist(&self, batch: &[ScoredVoter]) -> Result<u64, PersistenceError> {
        debug!(rows = batch.len(), "Dry run: skipping score update");
        Ok(0)
    }
}
