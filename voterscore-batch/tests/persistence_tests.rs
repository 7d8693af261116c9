//! Score persistence tiers against a real SQLite database

mod helpers;

use helpers::*;
use std::time::Duration;
use voterscore_batch::services::{BulkScoreWriter, FallbackScoreWriter, RowScoreWriter, ScoreWriter};
use voterscore_batch::{PersistenceError, ScoredVoter};

fn scored(ids: &[String], score: f64) -> Vec<ScoredVoter> {
    ids.iter()
        .map(|id| ScoredVoter { registration_number: id.clone(), score })
        .collect()
}

#[tokio::test]
async fn test_bulk_update_writes_every_row() {
    let (_dir, pool) = create_test_db().await;
    let ids = seed_voters(&pool, 50).await;
    let writer = BulkScoreWriter::new(pool.clone(), Duration::from_secs(5));

    let updated = writer.persist(&scored(&ids, 6.4)).await.unwrap();

    assert_eq!(updated, 50);
    assert_eq!(score_of(&pool, &ids[0]).await, Some(6.4));
    assert_eq!(score_of(&pool, &ids[49]).await, Some(6.4));
}

#[tokio::test]
async fn test_bulk_update_counts_only_existing_rows() {
    let (_dir, pool) = create_test_db().await;
    let mut ids = seed_voters(&pool, 3).await;
    ids.push("NOT-IN-REGISTRY".to_string());
    let writer = BulkScoreWriter::new(pool.clone(), Duration::from_secs(5));

    assert_eq!(writer.persist(&scored(&ids, 5.0)).await.unwrap(), 3);
}

#[tokio::test]
async fn test_bulk_update_treats_ids_as_data() {
    let (_dir, pool) = create_test_db().await;
    let hostile = "X'); DELETE FROM voters; --".to_string();
    seed_voter(&pool, &hostile, "Active", &[]).await;
    seed_voter(&pool, "SAFE", "Active", &[]).await;
    let writer = BulkScoreWriter::new(pool.clone(), Duration::from_secs(5));

    let updated = writer.persist(&scored(&[hostile.clone()], 3.3)).await.unwrap();

    assert_eq!(updated, 1);
    assert_eq!(score_of(&pool, &hostile).await, Some(3.3));
    assert_eq!(score_of(&pool, "SAFE").await, None);
}

#[tokio::test]
async fn test_bulk_update_fails_atomically_when_a_row_is_rejected() {
    let (_dir, pool) = create_test_db().await;
    let ids = seed_voters(&pool, 5).await;
    reject_updates_of(&pool, &ids[2]).await;
    let writer = BulkScoreWriter::new(pool.clone(), Duration::from_secs(5));

    assert!(writer.persist(&scored(&ids, 8.0)).await.is_err());
    assert_eq!(scored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_row_writer_skips_failing_row_and_commits_rest() {
    let (_dir, pool) = create_test_db().await;
    let ids = seed_voters(&pool, 5).await;
    reject_updates_of(&pool, &ids[2]).await;
    let writer = RowScoreWriter::new(pool.clone());

    let updated = writer.persist(&scored(&ids, 8.0)).await.unwrap();

    assert_eq!(updated, 4);
    assert_eq!(scored_count(&pool).await, 4);
    assert_eq!(score_of(&pool, &ids[2]).await, None);
    assert_eq!(score_of(&pool, &ids[3]).await, Some(8.0));
}

#[tokio::test]
async fn test_fallback_recovers_from_bulk_failure() {
    let (_dir, pool) = create_test_db().await;
    let ids = seed_voters(&pool, 10).await;
    reject_updates_of(&pool, &ids[7]).await;
    let writer = FallbackScoreWriter::sqlite(pool.clone(), Duration::from_secs(5));

    let updated = writer.persist(&scored(&ids, 9.1)).await.unwrap();

    assert_eq!(updated, 9);
    assert_eq!(score_of(&pool, &ids[0]).await, Some(9.1));
    assert_eq!(score_of(&pool, &ids[7]).await, None);
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let (_dir, pool) = create_test_db().await;
    let writer = FallbackScoreWriter::sqlite(pool.clone(), Duration::from_secs(5));
    assert_eq!(writer.persist(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_rewrite_overwrites_previous_score() {
    let (_dir, pool) = create_test_db().await;
    let ids = seed_voters(&pool, 2).await;
    let writer = BulkScoreWriter::new(pool.clone(), Duration::from_secs(5));

    writer.persist(&scored(&ids, 4.0)).await.unwrap();
    writer.persist(&scored(&ids, 6.0)).await.unwrap();

    assert_eq!(score_of(&pool, &ids[1]).await, Some(6.0));
}

/// Hold the database write lock on a separate pooled connection until
/// `hold` has elapsed
async fn hold_write_lock(pool: &sqlx::SqlitePool, hold: Duration) -> tokio::task::JoinHandle<()> {
    let mut lock = pool.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *lock).await.unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(hold).await;
        sqlx::query("COMMIT").execute(&mut *lock).await.unwrap();
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bulk_update_times_out_while_registry_is_locked() {
    let (_dir, pool) = create_test_db().await;
    let ids = seed_voters(&pool, 5).await;
    let release = hold_write_lock(&pool, Duration::from_millis(500)).await;
    let writer = BulkScoreWriter::new(pool.clone(), Duration::from_millis(100));

    let result = writer.persist(&scored(&ids, 7.0)).await;

    assert!(matches!(result, Err(PersistenceError::Timeout(100))));
    release.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bulk_timeout_falls_back_to_row_updates() {
    let (_dir, pool) = create_test_db().await;
    let ids = seed_voters(&pool, 5).await;
    let release = hold_write_lock(&pool, Duration::from_millis(300)).await;
    let writer = FallbackScoreWriter::sqlite(pool.clone(), Duration::from_millis(100));

    let updated = writer.persist(&scored(&ids, 7.0)).await.unwrap();
    release.await.unwrap();

    assert_eq!(updated, 5);
    assert_eq!(scored_count(&pool).await, 5);
    for id in &ids {
        assert_eq!(score_of(&pool, id).await, Some(7.0));
    }
}
