//! SQLite database handle for the outbox
//!
//! The outbox workload is one writer (the engine's store) issuing small,
//! whole-document reads and writes, so the pool is deliberately tiny:
//! two connections for a file-backed database, one for the in-memory
//! test mode (an in-memory SQLite database lives and dies with its
//! connection). WAL journaling keeps the occasional concurrent read off
//! the writer's back.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::StoreError;

/// Schema statements applied on every open; all idempotent
const SCHEMA: &str = include_str!("migrations/20260815_initial.sql");

/// How long a query waits on write contention before `SQLITE_BUSY`
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the SQLite connection pool backing [`SqliteOutboxStore`]
///
/// [`SqliteOutboxStore`]: crate::SqliteOutboxStore
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the outbox database at `db_path`, creating the file and any
    /// missing parent directories, and applies the schema
    ///
    /// # Errors
    /// Returns `StoreError::ConnectionFailed` when the file cannot be
    /// opened, or `StoreError::MigrationFailed` when the schema cannot
    /// be applied.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!("Cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Cannot open {}: {e}", db_path.display()))
            })?;

        Self::apply_schema(&pool).await?;
        tracing::info!(path = %db_path.display(), "Outbox database opened");

        Ok(Self { pool })
    }

    /// Opens a fresh in-memory database
    ///
    /// Pinned to a single connection because each SQLite in-memory
    /// database is private to the connection that created it.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Cannot open in-memory database: {e}"))
            })?;

        Self::apply_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn apply_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        tracing::debug!("Outbox schema applied");
        Ok(())
    }
}
