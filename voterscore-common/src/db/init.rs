//! Database initialization
//!
//! Opens (or creates) the voter registry database and makes sure the tables
//! the scoring job reads and writes exist.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection, in milliseconds
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Applied by sqlx to every connection the pool opens.
    // WAL lets readers (reports, dashboards) keep working while the job writes
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_voters_table(&pool).await?;
    create_voter_history_table(&pool).await?;

    Ok(pool)
}

async fn create_voters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voters (
            registration_number TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            participation_score REAL,
            score_updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_voter_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voter_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            registration_number TEXT NOT NULL REFERENCES voters(registration_number) ON DELETE CASCADE,
            election_date TEXT NOT NULL,
            election_type TEXT NOT NULL,
            party TEXT,
            ballot_style TEXT,
            absentee INTEGER NOT NULL DEFAULT 0,
            provisional INTEGER NOT NULL DEFAULT 0,
            supplemental INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_voter_history_registration ON voter_history(registration_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert or replace a voter (status only; score is left untouched on insert)
///
/// Seeding utility for fixtures and imports; the scoring job never writes
/// voters or history.
pub async fn upsert_voter(pool: &SqlitePool, registration_number: &str, status: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO voters (registration_number, status)
        VALUES (?, ?)
        ON CONFLICT(registration_number) DO UPDATE SET status = excluded.status
        "#,
    )
    .bind(registration_number)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(())
}

/// Append one history event for a voter
///
/// Seeding utility, see [`upsert_voter`].
pub async fn insert_history(pool: &SqlitePool, row: &crate::db::HistoryRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO voter_history (
            registration_number, election_date, election_type,
            party, ballot_style, absentee, provisional, supplemental
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.registration_number)
    .bind(&row.election_date)
    .bind(&row.election_type)
    .bind(&row.party)
    .bind(&row.ballot_style)
    .bind(row.absentee)
    .bind(row.provisional)
    .bind(row.supplemental)
    .execute(pool)
    .await?;

    Ok(())
}
