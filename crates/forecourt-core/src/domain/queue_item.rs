//! QueueItem domain entity
//!
//! This module defines the QueueItem entity which represents a pending
//! mutation awaiting delivery to the hosted backend, and the FailedItem
//! entity holding quarantined mutations that exhausted automatic retry.
//!
//! ## Lifecycle
//!
//! ```text
//!     ┌──────────┐   dispatch ok   ┌─────────────┐
//!     │  Queued  │ ──────────────► │  Delivered  │ (removed)
//!     └──────────┘                 └─────────────┘
//!          │  ▲
//! dispatch │  │ retry_count < max   (retry_count += 1)
//!   failed │  └──────────────────┐
//!          ▼                     │
//!     retry_count == max         │
//!          │                     │
//!          ▼                     │
//!     ┌─────────────┐  manual retry (retry_count = 0)
//!     │ Quarantined │ ───────────┘
//!     └─────────────┘
//! ```
//!
//! An item exists in exactly one of {pending queue, quarantine list,
//! nowhere (delivered)} at any time; promotion to FailedItem is a move,
//! never a copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::errors::DomainError;
use super::newtypes::{Collection, MutationId};

// ============================================================================
// MutationAction
// ============================================================================

/// The kind of write a queue item carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationAction {
    /// Insert a new row into the target collection
    Create,
    /// Apply a partial patch to an existing row
    Update,
    /// Remove a row from the target collection
    Delete,
}

impl MutationAction {
    /// Returns the action name as a string
    pub fn name(&self) -> &'static str {
        match self {
            MutationAction::Create => "create",
            MutationAction::Update => "update",
            MutationAction::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for MutationAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(MutationAction::Create),
            "update" => Ok(MutationAction::Update),
            "delete" => Ok(MutationAction::Delete),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}

// ============================================================================
// ItemMetadata
// ============================================================================

/// Client-side metadata attached to every queued mutation
///
/// Captured at enqueue time so operators can trace which terminal and
/// client build produced a write, long after the device went back online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Identifier of the device/terminal that enqueued the mutation
    pub device_id: String,
    /// Version of the client application
    pub client_version: String,
    /// Optional free-form source tag (e.g. "pos", "shift-close")
    pub source: Option<String>,
}

impl ItemMetadata {
    /// Creates metadata for a device and client version, with no source tag
    pub fn new(device_id: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            client_version: client_version.into(),
            source: None,
        }
    }

    /// Sets the free-form source tag
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ============================================================================
// QueueItem
// ============================================================================

/// A pending mutation awaiting delivery to the backend
///
/// QueueItem is the core domain entity of the outbox. It is created by
/// `SyncEngine::enqueue`, mutated in place by the sync processor
/// (`retry_count` increments), and destroyed either by successful delivery
/// or by promotion to [`FailedItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Locally generated unique identifier (not the eventual remote key)
    id: MutationId,
    /// The kind of write this item carries
    action: MutationAction,
    /// Target record type on the backend
    collection: Collection,
    /// Opaque structured data for the mutation (patch for updates, full or
    /// keyed record for creates/deletes)
    payload: Value,
    /// When the mutation was enqueued (ordering hint within a collection)
    enqueued_at: DateTime<Utc>,
    /// Delivery attempts so far
    retry_count: u32,
    /// Acting user at enqueue time, if identity was resolved
    owner_id: Option<String>,
    /// Device and client-version metadata
    metadata: ItemMetadata,
}

impl QueueItem {
    /// Creates a new QueueItem with a fresh local id and zero retries
    pub fn new(
        action: MutationAction,
        collection: Collection,
        payload: Value,
        owner_id: Option<String>,
        metadata: ItemMetadata,
    ) -> Self {
        Self {
            id: MutationId::generate(),
            action,
            collection,
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
            owner_id,
            metadata,
        }
    }

    // --- Getters ---

    /// Returns the item's local identifier
    pub fn id(&self) -> &MutationId {
        &self.id
    }

    /// Returns the mutation action
    pub fn action(&self) -> MutationAction {
        self.action
    }

    /// Returns the target collection
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Returns the mutation payload
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns when the item was enqueued
    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// Returns the number of delivery attempts so far
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the acting user captured at enqueue time
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Returns the client metadata
    pub fn metadata(&self) -> &ItemMetadata {
        &self.metadata
    }

    // --- Mutations applied by the sync processor ---

    /// Records a failed delivery attempt
    pub fn record_attempt(&mut self) {
        self.retry_count += 1;
    }

    /// Resets the retry counter (used when demoting a quarantined item
    /// back into the pending queue)
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }

    /// Rewrites every occurrence of a temporary local id in the payload to
    /// the canonical id assigned by the backend, recursing through nested
    /// objects and arrays.
    ///
    /// Returns true if at least one occurrence was rewritten.
    pub fn remap_id(&mut self, local: &str, canonical: &str) -> bool {
        rewrite_value(&mut self.payload, local, canonical)
    }
}

/// Recursively rewrites string values equal to `from` into `to`
fn rewrite_value(value: &mut Value, from: &str, to: &str) -> bool {
    match value {
        Value::String(s) if s == from => {
            *s = to.to_string();
            true
        }
        Value::Array(items) => {
            let mut changed = false;
            for item in items {
                changed |= rewrite_value(item, from, to);
            }
            changed
        }
        Value::Object(map) => {
            let mut changed = false;
            for (_, v) in map.iter_mut() {
                changed |= rewrite_value(v, from, to);
            }
            changed
        }
        _ => false,
    }
}

// ============================================================================
// ErrorDetail
// ============================================================================

/// Diagnostic captured when a delivery attempt fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable error message
    pub message: String,
    /// Backend error code, when one was reported
    pub code: Option<String>,
    /// Structured error details, when the backend supplied any
    pub details: Option<Value>,
}

impl ErrorDetail {
    /// Creates an ErrorDetail with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
        }
    }

    /// Sets the backend error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the structured details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

// ============================================================================
// FailedItem
// ============================================================================

/// A quarantined mutation that exhausted automatic retry
///
/// Created only when `retry_count` reaches the configured maximum; the
/// source QueueItem is removed from the pending queue at that point.
/// Destroyed by manual retry (demotion back to a QueueItem with
/// `retry_count` reset to 0) or by explicit bulk clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    /// The quarantined mutation, retry counter frozen at the maximum
    item: QueueItem,
    /// The error captured on the final attempt
    error: ErrorDetail,
    /// When the item was quarantined
    failed_at: DateTime<Utc>,
}

impl FailedItem {
    /// Quarantines a queue item with the error from its final attempt
    pub fn quarantine(item: QueueItem, error: ErrorDetail) -> Self {
        Self {
            item,
            error,
            failed_at: Utc::now(),
        }
    }

    /// Returns the quarantined item's identifier
    pub fn id(&self) -> &MutationId {
        self.item.id()
    }

    /// Returns the quarantined mutation
    pub fn item(&self) -> &QueueItem {
        &self.item
    }

    /// Returns the captured error
    pub fn error(&self) -> &ErrorDetail {
        &self.error
    }

    /// Returns when the item was quarantined
    pub fn failed_at(&self) -> DateTime<Utc> {
        self.failed_at
    }

    /// Demotes the failed item back into a pending QueueItem with the
    /// retry counter reset to zero
    pub fn release(self) -> QueueItem {
        let mut item = self.item;
        item.reset_retries();
        item
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_item(action: MutationAction, payload: Value) -> QueueItem {
        QueueItem::new(
            action,
            Collection::new("sales".to_string()).unwrap(),
            payload,
            Some("user_1".to_string()),
            ItemMetadata::new("pos-7", "2.4.1"),
        )
    }

    mod action_tests {
        use super::*;

        #[test]
        fn test_name_and_display() {
            assert_eq!(MutationAction::Create.name(), "create");
            assert_eq!(MutationAction::Update.to_string(), "update");
            assert_eq!(MutationAction::Delete.to_string(), "delete");
        }

        #[test]
        fn test_from_str() {
            assert_eq!("create".parse::<MutationAction>().unwrap(), MutationAction::Create);
            assert_eq!("delete".parse::<MutationAction>().unwrap(), MutationAction::Delete);

            let err = "upsert".parse::<MutationAction>().unwrap_err();
            assert_eq!(err, DomainError::UnknownAction("upsert".to_string()));
        }

        #[test]
        fn test_serde_snake_case() {
            let json = serde_json::to_string(&MutationAction::Create).unwrap();
            assert_eq!(json, "\"create\"");

            let parsed: MutationAction = serde_json::from_str("\"delete\"").unwrap();
            assert_eq!(parsed, MutationAction::Delete);
        }
    }

    mod queue_item_tests {
        use super::*;

        #[test]
        fn test_new_generates_local_id() {
            let item = test_item(MutationAction::Create, json!({"amount": 100}));
            assert!(item.id().is_local());
            assert_eq!(item.retry_count(), 0);
            assert_eq!(item.owner_id(), Some("user_1"));
            assert_eq!(item.metadata().device_id, "pos-7");
        }

        #[test]
        fn test_record_attempt_increments() {
            let mut item = test_item(MutationAction::Update, json!({"id": "e1"}));
            item.record_attempt();
            item.record_attempt();
            assert_eq!(item.retry_count(), 2);

            item.reset_retries();
            assert_eq!(item.retry_count(), 0);
        }

        #[test]
        fn test_remap_id_top_level() {
            let mut item = test_item(
                MutationAction::Create,
                json!({"station_id": "local_a", "amount": 10}),
            );
            assert!(item.remap_id("local_a", "srv_1"));
            assert_eq!(item.payload()["station_id"], "srv_1");
            assert_eq!(item.payload()["amount"], 10);
        }

        #[test]
        fn test_remap_id_nested_structures() {
            let mut item = test_item(
                MutationAction::Create,
                json!({
                    "lines": [
                        {"pump": "local_p", "litres": 42.5},
                        {"pump": "p9"}
                    ],
                    "audit": {"station": "local_p"}
                }),
            );
            assert!(item.remap_id("local_p", "srv_9"));
            assert_eq!(item.payload()["lines"][0]["pump"], "srv_9");
            assert_eq!(item.payload()["lines"][1]["pump"], "p9");
            assert_eq!(item.payload()["audit"]["station"], "srv_9");
        }

        #[test]
        fn test_remap_id_no_match() {
            let mut item = test_item(MutationAction::Create, json!({"id": "x"}));
            assert!(!item.remap_id("local_a", "srv_1"));
        }

        #[test]
        fn test_remap_does_not_touch_non_strings() {
            // A numeric value that happens to print like the id must not change
            let mut item = test_item(MutationAction::Create, json!({"n": 42}));
            assert!(!item.remap_id("42", "srv_1"));
            assert_eq!(item.payload()["n"], 42);
        }

        #[test]
        fn test_serialization_roundtrip() {
            let item = test_item(MutationAction::Delete, json!({"id": "s3"}));
            let json = serde_json::to_string(&item).unwrap();
            let parsed: QueueItem = serde_json::from_str(&json).unwrap();
            assert_eq!(item, parsed);
        }
    }

    mod failed_item_tests {
        use super::*;

        #[test]
        fn test_quarantine_captures_error() {
            let mut item = test_item(MutationAction::Update, json!({"id": "e1"}));
            item.record_attempt();
            item.record_attempt();
            item.record_attempt();

            let failed = FailedItem::quarantine(
                item.clone(),
                ErrorDetail::new("backend rejected patch").with_code("422"),
            );

            assert_eq!(failed.id(), item.id());
            assert_eq!(failed.item().retry_count(), 3);
            assert_eq!(failed.error().code.as_deref(), Some("422"));
        }

        #[test]
        fn test_release_resets_retries() {
            let mut item = test_item(MutationAction::Update, json!({"id": "e1"}));
            item.record_attempt();
            let failed = FailedItem::quarantine(item, ErrorDetail::new("boom"));

            let released = failed.release();
            assert_eq!(released.retry_count(), 0);
        }

        #[test]
        fn test_error_detail_display() {
            let err = ErrorDetail::new("timeout").with_code("504");
            assert_eq!(err.to_string(), "[504] timeout");

            let err = ErrorDetail::new("timeout");
            assert_eq!(err.to_string(), "timeout");
        }
    }
}
