//! Integration tests for SqliteOutboxStore
//!
//! These tests verify all IOutboxStore methods using an in-memory SQLite
//! database, plus restart durability against a file-backed database in a
//! temporary directory. Each test function creates a fresh database to
//! ensure test isolation.

use chrono::Utc;
use serde_json::json;

use forecourt_core::domain::{
    Collection, ErrorDetail, FailedItem, ItemMetadata, MutationAction, QueueItem, SyncStats,
};
use forecourt_core::ports::IOutboxStore;
use forecourt_store::{DatabasePool, SqliteOutboxStore};

// ============================================================================
// Test helpers
// ============================================================================

/// Create a fresh in-memory store for each test
async fn setup() -> SqliteOutboxStore {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteOutboxStore::new(pool.pool().clone())
}

fn test_item(collection: &str, payload: serde_json::Value) -> QueueItem {
    QueueItem::new(
        MutationAction::Create,
        Collection::new(collection.to_string()).unwrap(),
        payload,
        Some("user_1".to_string()),
        ItemMetadata::new("pos-3", "1.9.0").with_source("pos"),
    )
}

// ============================================================================
// Queue tests
// ============================================================================

#[tokio::test]
async fn test_load_queue_empty_on_fresh_database() {
    let store = setup().await;
    let queue = store.load_queue().await.unwrap();
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_save_and_load_queue() {
    let store = setup().await;
    let items = vec![
        test_item("sales", json!({"amount": 120.5, "pump": "p3"})),
        test_item("shifts", json!({"operator": "u7"})),
    ];

    store.save_queue(&items).await.unwrap();

    let loaded = store.load_queue().await.unwrap();
    assert_eq!(loaded, items);
}

#[tokio::test]
async fn test_save_queue_replaces_previous_document() {
    let store = setup().await;

    store
        .save_queue(&[test_item("sales", json!({"n": 1}))])
        .await
        .unwrap();
    store
        .save_queue(&[
            test_item("sales", json!({"n": 2})),
            test_item("sales", json!({"n": 3})),
        ])
        .await
        .unwrap();

    let loaded = store.load_queue().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].payload()["n"], 2);
}

#[tokio::test]
async fn test_save_empty_queue_clears_document() {
    let store = setup().await;

    store
        .save_queue(&[test_item("sales", json!({"n": 1}))])
        .await
        .unwrap();
    store.save_queue(&[]).await.unwrap();

    let loaded = store.load_queue().await.unwrap();
    assert!(loaded.is_empty());
}

// ============================================================================
// Quarantine tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load_failed_items() {
    let store = setup().await;

    let mut item = test_item("expenses", json!({"amount": 40}));
    item.record_attempt();
    item.record_attempt();
    item.record_attempt();
    let failed = FailedItem::quarantine(
        item,
        ErrorDetail::new("backend rejected payload").with_code("422"),
    );

    store.save_failed(std::slice::from_ref(&failed)).await.unwrap();

    let loaded = store.load_failed().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0], failed);
    assert_eq!(loaded[0].error().code.as_deref(), Some("422"));
}

#[tokio::test]
async fn test_failed_items_independent_of_queue() {
    let store = setup().await;

    store
        .save_queue(&[test_item("sales", json!({"n": 1}))])
        .await
        .unwrap();
    let failed = FailedItem::quarantine(
        test_item("sales", json!({"n": 2})),
        ErrorDetail::new("timeout"),
    );
    store.save_failed(std::slice::from_ref(&failed)).await.unwrap();

    // Clearing the queue must not touch the quarantine
    store.save_queue(&[]).await.unwrap();

    assert!(store.load_queue().await.unwrap().is_empty());
    assert_eq!(store.load_failed().await.unwrap().len(), 1);
}

// ============================================================================
// Stats tests
// ============================================================================

#[tokio::test]
async fn test_load_stats_zeroed_on_fresh_database() {
    let store = setup().await;
    let stats = store.load_stats().await.unwrap();
    assert_eq!(stats, SyncStats::default());
}

#[tokio::test]
async fn test_save_and_load_stats() {
    let store = setup().await;

    let mut stats = SyncStats::default();
    stats.record_success();
    stats.record_success();
    stats.record_failure();
    stats.mark_sync_completed(Utc::now());

    store.save_stats(&stats).await.unwrap();

    let loaded = store.load_stats().await.unwrap();
    assert_eq!(loaded, stats);
}

#[tokio::test]
async fn test_stats_survive_queue_clear() {
    let store = setup().await;

    let mut stats = SyncStats::default();
    stats.record_success();
    stats.record_failure();
    store.save_stats(&stats).await.unwrap();

    store.save_queue(&[]).await.unwrap();
    store.save_failed(&[]).await.unwrap();

    let loaded = store.load_stats().await.unwrap();
    assert_eq!(loaded.success_count, 1);
    assert_eq!(loaded.failure_count, 1);
}

// ============================================================================
// Durability tests
// ============================================================================

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("outbox.db");

    let items = vec![test_item("tank_readings", json!({"tank": 2, "litres": 8100}))];
    let failed = FailedItem::quarantine(
        test_item("sales", json!({"n": 9})),
        ErrorDetail::new("server error").with_code("500"),
    );
    let mut stats = SyncStats::default();
    stats.record_success();
    stats.record_success();

    {
        let pool = DatabasePool::new(&db_path).await.unwrap();
        let store = SqliteOutboxStore::new(pool.pool().clone());
        store.save_queue(&items).await.unwrap();
        store.save_failed(std::slice::from_ref(&failed)).await.unwrap();
        store.save_stats(&stats).await.unwrap();
    }

    // Reopen the same file as a simulated process restart
    let pool = DatabasePool::new(&db_path).await.unwrap();
    let store = SqliteOutboxStore::new(pool.pool().clone());

    assert_eq!(store.load_queue().await.unwrap(), items);
    assert_eq!(store.load_failed().await.unwrap(), vec![failed]);
    assert_eq!(store.load_stats().await.unwrap(), stats);
}

#[tokio::test]
async fn test_open_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("var").join("forecourt").join("outbox.db");

    let pool = DatabasePool::new(&db_path).await.unwrap();
    let store = SqliteOutboxStore::new(pool.pool().clone());

    assert!(db_path.exists());
    assert!(store.load_queue().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_document_degrades_to_empty() {
    let pool = DatabasePool::in_memory().await.unwrap();

    // Plant a document that is not valid JSON for the expected type
    sqlx::query("INSERT INTO outbox_records (key, value, updated_at) VALUES (?, ?, ?)")
        .bind("pending_queue")
        .bind("{definitely not a queue")
        .bind(Utc::now().to_rfc3339())
        .execute(pool.pool())
        .await
        .unwrap();

    let store = SqliteOutboxStore::new(pool.pool().clone());
    let queue = store.load_queue().await.unwrap();
    assert!(queue.is_empty());

    // A fresh save must recover the slot
    store
        .save_queue(&[test_item("sales", json!({"n": 1}))])
        .await
        .unwrap();
    assert_eq!(store.load_queue().await.unwrap().len(), 1);
}
