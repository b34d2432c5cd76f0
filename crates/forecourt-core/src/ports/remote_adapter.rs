//! Remote adapter port (driven/secondary port)
//!
//! This module defines the interface for applying mutations to the hosted
//! backend. Implementations wrap whatever transport the deployment uses
//! (HTTP API client, backend SDK) behind collection-level insert, update
//! and delete operations.
//!
//! ## Design Notes
//!
//! - Errors carry a semantic classification rather than transport detail,
//!   because the sync processor's idempotence rules depend on WHY a call
//!   failed: a duplicate-key conflict on insert and a missing row on
//!   delete both count as success for a replayed mutation.
//! - `insert` returns the created record so the processor can read the
//!   canonical server-assigned id and remap temporary local ids in
//!   payloads still waiting in the queue.

use serde_json::Value;
use thiserror::Error;

/// Semantic failure classification for remote operations
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The backend rejected an insert because the record already exists
    #[error("Record already exists: {0}")]
    Conflict(String),

    /// The backend has no record with the targeted id
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Any other failure (network, auth, validation, server error)
    #[error("Remote operation failed: {message}")]
    Failed {
        /// Human-readable description of the failure
        message: String,
        /// Backend error code, when one was reported
        code: Option<String>,
        /// Structured error details, when the backend supplied any
        details: Option<Value>,
    },
}

impl RemoteError {
    /// Creates a generic failure with only a message
    pub fn failed(message: impl Into<String>) -> Self {
        RemoteError::Failed {
            message: message.into(),
            code: None,
            details: None,
        }
    }
}

/// Port trait for applying mutations to the hosted backend
///
/// All operations address a record type by collection name. The adapter is
/// expected to be stateless with respect to the outbox; delivery ordering
/// and retry are the sync processor's concern.
///
/// ## Implementation Notes
///
/// - `insert` must classify duplicate-key rejections as
///   [`RemoteError::Conflict`] so replayed creates can be treated as
///   already-delivered.
/// - `delete` must classify missing-row rejections as
///   [`RemoteError::NotFound`] for the same reason.
/// - Transport failures (timeouts, connection refused) map to
///   [`RemoteError::Failed`].
#[async_trait::async_trait]
pub trait IRemoteAdapter: Send + Sync {
    /// Inserts a new record into a collection
    ///
    /// Returns the created record as the backend stored it, including the
    /// canonical server-assigned `id`.
    ///
    /// # Arguments
    /// * `collection` - Target record type
    /// * `record` - The record to insert (without a canonical id)
    async fn insert(&self, collection: &str, record: &Value) -> Result<Value, RemoteError>;

    /// Applies a partial patch to an existing record
    ///
    /// # Arguments
    /// * `collection` - Target record type
    /// * `id` - Canonical id of the record to patch
    /// * `patch` - Fields to change (immutable fields already stripped)
    async fn update(&self, collection: &str, id: &str, patch: &Value) -> Result<(), RemoteError>;

    /// Deletes a record from a collection
    ///
    /// # Arguments
    /// * `collection` - Target record type
    /// * `id` - Canonical id of the record to delete
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;
}
