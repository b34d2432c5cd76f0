//! Forecourt Store - Durable outbox persistence
//!
//! SQLite-based storage for:
//! - The pending mutation queue
//! - Quarantined (failed) mutations
//! - Lifetime synchronization statistics
//!
//! ## Architecture
//!
//! This crate implements the `IOutboxStore` port from `forecourt-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteOutboxStore`] - Full `IOutboxStore` implementation
//! - [`StoreError`] - Error types for storage operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use forecourt_store::{DatabasePool, SqliteOutboxStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/forecourt/outbox.db")).await?;
//! let store = SqliteOutboxStore::new(pool.pool().clone());
//! // Use store as IOutboxStore...
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod repository;

pub use db::DatabasePool;
pub use repository::SqliteOutboxStore;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
