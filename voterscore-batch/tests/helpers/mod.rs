//! Test utilities: temporary voter registries

#![allow(dead_code)]

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tempfile::TempDir;
use voterscore_batch::{ScoreCalculator, ScoringConfig};
use voterscore_common::db::{init_database, insert_history, upsert_voter, HistoryRow};

/// Create a temporary registry database
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("voters.db")).await.unwrap();
    (temp_dir, pool)
}

/// Insert a voter with (date, election_type) history entries
pub async fn seed_voter(pool: &SqlitePool, id: &str, status: &str, history: &[(&str, &str)]) {
    upsert_voter(pool, id, status).await.unwrap();
    for (date, election_type) in history {
        let row = HistoryRow {
            registration_number: id.to_string(),
            election_date: date.to_string(),
            election_type: election_type.to_string(),
            party: Some("NPA".to_string()),
            ballot_style: None,
            absentee: false,
            provisional: false,
            supplemental: false,
        };
        insert_history(pool, &row).await.unwrap();
    }
}

/// Insert `n` active voters, each with one general vote in 2022
pub async fn seed_voters(pool: &SqlitePool, n: usize) -> Vec<String> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let id = format!("V{:05}", i);
        seed_voter(pool, &id, "Active", &[("2022-11-08", "GENERAL")]).await;
        ids.push(id);
    }
    ids
}

/// Persisted score for one voter
pub async fn score_of(pool: &SqlitePool, id: &str) -> Option<f64> {
    sqlx::query_scalar("SELECT participation_score FROM voters WHERE registration_number = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Number of voters with a persisted score
pub async fn scored_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM voters WHERE participation_score IS NOT NULL")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Make every UPDATE of `id` fail
pub async fn reject_updates_of(pool: &SqlitePool, id: &str) {
    // Trigger bodies cannot take parameters; ids used here are test literals
    let sql = format!(
        "CREATE TRIGGER reject_{trigger} BEFORE UPDATE ON voters \
         WHEN NEW.registration_number = '{id}' \
         BEGIN SELECT RAISE(ABORT, 'update rejected'); END",
        trigger = id.replace('-', "_"),
        id = id,
    );
    sqlx::query(&sql).execute(pool).await.unwrap();
}

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

pub fn calculator() -> ScoreCalculator {
    ScoreCalculator::new(ScoringConfig::default(), as_of())
}
