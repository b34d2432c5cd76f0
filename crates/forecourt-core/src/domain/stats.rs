//! Synchronization statistics
//!
//! Counters describing the lifetime delivery record of the outbox.
//! Persisted independently of the queue so totals survive restarts and
//! queue clears, and updated by the sync processor after every flush.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime delivery counters for the outbox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Total mutations delivered successfully
    pub success_count: u64,
    /// Total delivery attempts that failed (including retries)
    pub failure_count: u64,
    /// When the last flush cycle finished, if any ever has
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl SyncStats {
    /// Records a successful delivery
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    /// Records a failed delivery attempt
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    /// Marks the end of a flush cycle
    pub fn mark_sync_completed(&mut self, at: DateTime<Utc>) {
        self.last_sync_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed() {
        let stats = SyncStats::default();
        assert_eq!(stats.success_count, 0);
        assert_eq!(stats.failure_count, 0);
        assert!(stats.last_sync_at.is_none());
    }

    #[test]
    fn test_counters_accumulate() {
        let mut stats = SyncStats::default();
        stats.record_success();
        stats.record_success();
        stats.record_failure();

        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.failure_count, 1);
    }

    #[test]
    fn test_mark_sync_completed() {
        let mut stats = SyncStats::default();
        let now = Utc::now();
        stats.mark_sync_completed(now);
        assert_eq!(stats.last_sync_at, Some(now));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut stats = SyncStats::default();
        stats.record_success();
        stats.mark_sync_completed(Utc::now());

        let json = serde_json::to_string(&stats).unwrap();
        let parsed: SyncStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, parsed);
    }
}
