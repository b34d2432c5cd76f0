//! Forecourt Sync - Offline outbox engine
//!
//! Provides:
//! - Durable client-side write queue with at-least-once delivery
//! - Batched dispatch with per-item exponential backoff
//! - Quarantine lane for mutations that exhaust automatic retry
//! - Identifier remapping of local temporary ids to canonical server ids
//!
//! ## Modules
//!
//! - [`engine`] - The [`SyncEngine`](engine::SyncEngine) orchestrating queue,
//!   dispatch, quarantine, and stats
//! - [`events`] - Broadcast event types for observers
//! - [`monitor`] - Connectivity and identity transition watcher
//! - [`scheduler`] - Periodic auto-sync timer with live reconfiguration

pub mod engine;
pub mod events;
pub mod monitor;
pub mod scheduler;

use thiserror::Error;

/// Errors surfaced by the public engine API
#[derive(Debug, Error)]
pub enum SyncError {
    /// A domain-level error propagated from forecourt-core
    #[error("Domain error: {0}")]
    Domain(#[from] forecourt_core::domain::errors::DomainError),

    /// The outbox store rejected a write
    #[error("Storage error: {0}")]
    Storage(String),
}
