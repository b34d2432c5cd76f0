//! Event types broadcast to engine observers
//!
//! Observers register explicitly via `SyncEngine::subscribe` and receive
//! events over a `tokio::sync::broadcast` channel. A slow or absent
//! observer never blocks the engine; broadcast drops the oldest events
//! when a receiver lags.

use forecourt_core::domain::{ErrorDetail, QueueItem};
use serde::Serialize;

/// Coarse engine state reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Connectivity restored
    Online,
    /// Connectivity lost
    Offline,
    /// A flush cycle is in progress
    Syncing,
    /// No flush cycle is in progress
    Idle,
    /// The last flush cycle aborted unexpectedly
    Error,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngineStatus::Online => "online",
            EngineStatus::Offline => "offline",
            EngineStatus::Syncing => "syncing",
            EngineStatus::Idle => "idle",
            EngineStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// An event emitted by the sync engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The engine's coarse state changed
    Status(EngineStatus),
    /// A mutation was appended to the pending queue
    ItemQueued(QueueItem),
    /// A mutation was delivered and removed from the queue
    ItemSucceeded(QueueItem),
    /// A mutation exhausted automatic retry and moved to the quarantine
    /// lane; transient failures that will retry do not emit an event
    ItemFailed(QueueItem, ErrorDetail),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(EngineStatus::Online.to_string(), "online");
        assert_eq!(EngineStatus::Syncing.to_string(), "syncing");
        assert_eq!(EngineStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&EngineStatus::Offline).unwrap();
        assert_eq!(json, "\"offline\"");
    }
}
