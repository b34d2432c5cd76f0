//! Outbox store port (driven/secondary port)
//!
//! This module defines the interface for durable persistence of the outbox
//! state: the pending queue, the quarantine list and the lifetime stats.
//! Implementations live in adapter crates (SQLite-backed in production,
//! in-memory in tests).
//!
//! ## Design Notes
//!
//! - Each of the three documents is written whole on every mutation. The
//!   queue is small (bounded by offline windows measured in hours, not
//!   weeks) so whole-document writes keep the persisted state trivially
//!   consistent with memory.
//! - Loads must be tolerant of corruption: a store that cannot decode a
//!   stored document returns the empty value rather than an error, so a
//!   damaged database never bricks the terminal.
//! - Uses `anyhow::Result` because storage failures are adapter-specific.

use crate::domain::{FailedItem, QueueItem, SyncStats};

/// Port trait for durable outbox persistence
#[async_trait::async_trait]
pub trait IOutboxStore: Send + Sync {
    /// Loads the pending queue, empty if nothing was ever stored
    async fn load_queue(&self) -> anyhow::Result<Vec<QueueItem>>;

    /// Replaces the stored pending queue
    async fn save_queue(&self, queue: &[QueueItem]) -> anyhow::Result<()>;

    /// Loads the quarantine list, empty if nothing was ever stored
    async fn load_failed(&self) -> anyhow::Result<Vec<FailedItem>>;

    /// Replaces the stored quarantine list
    async fn save_failed(&self, failed: &[FailedItem]) -> anyhow::Result<()>;

    /// Loads the lifetime stats, zeroed if nothing was ever stored
    async fn load_stats(&self) -> anyhow::Result<SyncStats>;

    /// Replaces the stored lifetime stats
    async fn save_stats(&self, stats: &SyncStats) -> anyhow::Result<()>;
}
