//! Voter registry reads
//!
//! Pages are returned in `registration_number` order. Keyset pagination
//! (`registration_number > last seen`) is the default; offset pagination is
//! kept for stores where the keyset column cannot be compared.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::future::Future;
use voterscore_common::Result;

use crate::models::{VoterRow, VoterStatus};

/// How the next page is located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Pagination {
    /// Resume after the last registration number seen
    #[default]
    Keyset,
    /// Skip the number of rows already fetched
    Offset,
}

/// Position and size of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Last registration number of the previous page (`None` for the first page)
    pub after: Option<String>,
    /// Number of rows fetched so far in this run
    pub offset: u64,
    pub limit: u32,
}

/// Paginated source of voter rows
pub trait VoterSource: Send + Sync {
    /// Fetch the next page; an empty page means the registry is exhausted
    fn fetch_page(&self, request: &PageRequest) -> impl Future<Output = Result<Vec<VoterRow>>> + Send;
}

// History is gathered per voter as a JSON array so a single statement returns
// the whole page. Zero history rows aggregate to '[]'.
const HISTORY_COLUMN: &str = r#"
    (SELECT json_group_array(json_object(
                'election_date', h.election_date,
                'election_type', h.election_type,
                'party', h.party,
                'ballot_style', h.ballot_style,
                'absentee', json(CASE WHEN h.absentee THEN 'true' ELSE 'false' END),
                'provisional', json(CASE WHEN h.provisional THEN 'true' ELSE 'false' END),
                'supplemental', json(CASE WHEN h.supplemental THEN 'true' ELSE 'false' END)))
       FROM voter_history h
      WHERE h.registration_number = v.registration_number) AS history
"#;

/// SQLite-backed voter registry
#[derive(Debug, Clone)]
pub struct SqliteVoterRegistry {
    db: SqlitePool,
    pagination: Pagination,
}

impl SqliteVoterRegistry {
    pub fn new(db: SqlitePool, pagination: Pagination) -> Self {
        Self { db, pagination }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    async fn fetch_keyset(&self, after: Option<&str>, limit: u32) -> Result<Vec<VoterRow>> {
        // Separate statements keep the primary key range scan usable
        let rows = match after {
            None => {
                let sql = format!(
                    "SELECT v.registration_number, v.status, {HISTORY_COLUMN}
                       FROM voters v
                      ORDER BY v.registration_number
                      LIMIT ?"
                );
                sqlx::query_as::<_, VoterRow>(&sql)
                    .bind(i64::from(limit))
                    .fetch_all(&self.db)
                    .await?
            }
            Some(last_seen) => {
                let sql = format!(
                    "SELECT v.registration_number, v.status, {HISTORY_COLUMN}
                       FROM voters v
                      WHERE v.registration_number > ?
                      ORDER BY v.registration_number
                      LIMIT ?"
                );
                sqlx::query_as::<_, VoterRow>(&sql)
                    .bind(last_seen)
                    .bind(i64::from(limit))
                    .fetch_all(&self.db)
                    .await?
            }
        };
        Ok(rows)
    }

    async fn fetch_offset(&self, offset: u64, limit: u32) -> Result<Vec<VoterRow>> {
        let sql = format!(
            "SELECT v.registration_number, v.status, {HISTORY_COLUMN}
               FROM voters v
              ORDER BY v.registration_number
              LIMIT ? OFFSET ?"
        );
        let offset = i64::try_from(offset).map_err(|_| {
            voterscore_common::Error::InvalidInput(format!("offset {} out of range", offset))
        })?;
        let rows = sqlx::query_as::<_, VoterRow>(&sql)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    /// Persisted scores, optionally restricted to one status; unscored voters are skipped
    pub async fn persisted_scores(&self, status: Option<VoterStatus>) -> Result<Vec<f64>> {
        let scores = match status {
            None => {
                sqlx::query_scalar::<_, f64>(
                    "SELECT participation_score FROM voters WHERE participation_score IS NOT NULL",
                )
                .fetch_all(&self.db)
                .await?
            }
            Some(status) => {
                sqlx::query_scalar::<_, f64>(
                    r#"
                    SELECT participation_score
                      FROM voters
                     WHERE participation_score IS NOT NULL
                       AND status = ?
                    "#,
                )
                .bind(status.as_str())
                .fetch_all(&self.db)
                .await?
            }
        };
        Ok(scores)
    }
}

impl VoterSource for SqliteVoterRegistry {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<VoterRow>> {
        match self.pagination {
            Pagination::Keyset => self.fetch_keyset(request.after.as_deref(), request.limit).await,
            Pagination::Offset => self.fetch_offset(request.offset, request.limit).await,
        }
    }
}
