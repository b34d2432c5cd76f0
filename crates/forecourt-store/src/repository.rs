//! SQLite implementation of IOutboxStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! outbox store port defined in forecourt-core. The store is a small
//! key-addressed document table:
//!
//! | Key             | Document                          |
//! |-----------------|-----------------------------------|
//! | `pending_queue` | JSON array of `QueueItem`         |
//! | `failed_items`  | JSON array of `FailedItem`        |
//! | `sync_stats`    | JSON object of `SyncStats`        |
//!
//! Every save rewrites the whole document for its key. Loads that find a
//! missing or undecodable document return the empty value so a damaged
//! database degrades to an empty outbox instead of a dead terminal.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use forecourt_core::domain::{FailedItem, QueueItem, SyncStats};
use forecourt_core::ports::IOutboxStore;

use crate::StoreError;

/// Storage key for the pending queue document
const KEY_QUEUE: &str = "pending_queue";
/// Storage key for the quarantine document
const KEY_FAILED: &str = "failed_items";
/// Storage key for the stats document
const KEY_STATS: &str = "sync_stats";

/// SQLite-based implementation of the outbox store port
///
/// All operations are performed through a connection pool for concurrency.
pub struct SqliteOutboxStore {
    pool: SqlitePool,
}

impl SqliteOutboxStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Loads and decodes the document stored under `key`
    ///
    /// Returns `None` when no document exists or when the stored text
    /// cannot be decoded; decode failures are logged, not propagated.
    async fn load_document<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let row = sqlx::query("SELECT value FROM outbox_records WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.get("value");
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(
                    key = key,
                    error = %e,
                    "Discarding undecodable outbox document"
                );
                Ok(None)
            }
        }
    }

    /// Encodes and stores a document under `key`, replacing any previous one
    async fn save_document<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO outbox_records (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl IOutboxStore for SqliteOutboxStore {
    async fn load_queue(&self) -> anyhow::Result<Vec<QueueItem>> {
        Ok(self.load_document(KEY_QUEUE).await?.unwrap_or_default())
    }

    async fn save_queue(&self, queue: &[QueueItem]) -> anyhow::Result<()> {
        self.save_document(KEY_QUEUE, &queue).await?;
        Ok(())
    }

    async fn load_failed(&self) -> anyhow::Result<Vec<FailedItem>> {
        Ok(self.load_document(KEY_FAILED).await?.unwrap_or_default())
    }

    async fn save_failed(&self, failed: &[FailedItem]) -> anyhow::Result<()> {
        self.save_document(KEY_FAILED, &failed).await?;
        Ok(())
    }

    async fn load_stats(&self) -> anyhow::Result<SyncStats> {
        Ok(self.load_document(KEY_STATS).await?.unwrap_or_default())
    }

    async fn save_stats(&self, stats: &SyncStats) -> anyhow::Result<()> {
        self.save_document(KEY_STATS, stats).await?;
        Ok(())
    }
}
