//! Domain entities and business logic
//!
//! This module contains the core domain types for the outbox:
//! - Newtypes for type-safe identifiers and validated domain types
//! - Queue item and quarantine entities
//! - Synchronization statistics
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod queue_item;
pub mod stats;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::{Collection, MutationId};
pub use queue_item::{ErrorDetail, FailedItem, ItemMetadata, MutationAction, QueueItem};
pub use stats::SyncStats;
