//! Tests for voter registry database initialization

use tempfile::TempDir;
use voterscore_common::db::{init_database, insert_history, upsert_voter, HistoryRow, BUSY_TIMEOUT_MS};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("voters.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("voters.db");

    let pool1 = init_database(&db_path).await.unwrap();
    upsert_voter(&pool1, "A100", "Active").await.unwrap();
    pool1.close().await;

    // Re-running initialization must not drop existing rows
    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM voters")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_upsert_voter_updates_status_and_keeps_score() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("voters.db")).await.unwrap();

    upsert_voter(&pool, "A100", "Active").await.unwrap();
    sqlx::query("UPDATE voters SET participation_score = 6.5 WHERE registration_number = 'A100'")
        .execute(&pool)
        .await
        .unwrap();
    upsert_voter(&pool, "A100", "Inactive").await.unwrap();

    let (status, score): (String, Option<f64>) = sqlx::query_as(
        "SELECT status, participation_score FROM voters WHERE registration_number = 'A100'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(status, "Inactive");
    assert_eq!(score, Some(6.5));
}

#[tokio::test]
async fn test_history_requires_existing_voter() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("voters.db")).await.unwrap();

    let row = HistoryRow {
        registration_number: "MISSING".to_string(),
        election_date: "2020-11-03".to_string(),
        election_type: "GENERAL".to_string(),
        party: None,
        ballot_style: None,
        absentee: false,
        provisional: false,
        supplemental: false,
    };

    // Foreign keys are enabled on every connection
    assert!(insert_history(&pool, &row).await.is_err());

    upsert_voter(&pool, "MISSING", "Active").await.unwrap();
    assert!(insert_history(&pool, &row).await.is_ok());
}

#[tokio::test]
async fn test_pragmas_apply_to_every_pooled_connection() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("voters.db")).await.unwrap();

    // Hold several connections at once so the pool has to open new ones
    let mut connections = Vec::new();
    for _ in 0..3 {
        connections.push(pool.acquire().await.unwrap());
    }

    for conn in connections.iter_mut() {
        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        let busy_timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&mut **conn)
            .await
            .unwrap();

        assert_eq!(foreign_keys, 1);
        assert_eq!(busy_timeout, BUSY_TIMEOUT_MS as i64);
        assert_eq!(journal_mode.to_lowercase(), "wal");
    }
}
