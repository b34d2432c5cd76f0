//! Outbox synchronization engine
//!
//! The [`SyncEngine`] owns the pending queue, the quarantine list, and the
//! lifetime stats, and orchestrates their delivery to the hosted backend
//! through the port traits of `forecourt-core`.
//!
//! ## Flush Flow
//!
//! 1. **Guard**: a single atomic flag; a flush requested while one is in
//!    flight returns immediately with zero counts
//! 2. **Batching**: the queue snapshot is split into batches of
//!    `batch_size`; items within a batch dispatch concurrently, batches
//!    run sequentially with a `retry_delay_ms` pause between them
//! 3. **Bookkeeping**: outcomes applied, local ids remapped, all three
//!    documents persisted after every batch
//!
//! ## Retry Logic
//!
//! Each failed delivery increments the item's `retry_count`. An item with
//! prior failures waits `min(retry_delay_ms * 2^(retry_count-1), 30s)`
//! before its next attempt. At `max_retries` the item moves to the
//! quarantine lane and stops retrying automatically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use forecourt_core::config::{SyncConfig, SyncConfigPatch};
use forecourt_core::domain::{
    ErrorDetail, FailedItem, ItemMetadata, MutationAction, MutationId, QueueItem, SyncStats,
};
use forecourt_core::domain::newtypes::Collection;
use forecourt_core::ports::{
    IConnectivityProvider, IIdentityProvider, IOutboxStore, IRemoteAdapter, RemoteError,
};

use crate::events::{EngineStatus, SyncEvent};
use crate::scheduler::SchedulerSettings;
use crate::SyncError;

// ============================================================================
// Constants
// ============================================================================

/// Ceiling for per-item exponential backoff (30 seconds)
const MAX_BACKOFF_MS: u64 = 30_000;

/// Fields a client may never patch; stripped from update payloads
const IMMUTABLE_FIELDS: &[&str] = &["id", "created_at", "created_by"];

/// Capacity of the observer broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// SyncOutcome
// ============================================================================

/// Summary of a completed flush cycle
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Mutations delivered and removed from the queue
    pub success: u32,
    /// Delivery attempts that failed (retried or quarantined)
    pub failures: u32,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

// ============================================================================
// SyncStatus
// ============================================================================

/// Point-in-time snapshot of the outbox for status surfaces
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    /// Mutations waiting in the queue
    pub pending: usize,
    /// Mutations in the quarantine lane
    pub failed: usize,
    /// Current connectivity state
    pub online: bool,
    /// Whether a flush cycle is in progress
    pub syncing: bool,
    /// When the last flush cycle finished
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Lifetime successful deliveries
    pub success_count: u64,
    /// Lifetime failed delivery attempts
    pub failure_count: u64,
}

// ============================================================================
// Internal state
// ============================================================================

/// The three durable records, guarded together so queue moves are atomic
struct OutboxState {
    queue: Vec<QueueItem>,
    failed: Vec<FailedItem>,
    stats: SyncStats,
}

/// Outcome of dispatching a single item to the backend
///
/// `Ok(Some(id))` carries the canonical server id of a freshly created
/// record; `Ok(None)` is a delivery with no id to learn (updates, deletes,
/// and conflict-as-success creates).
type DispatchResult = std::result::Result<Option<String>, ErrorDetail>;

// ============================================================================
// SyncEngine
// ============================================================================

/// Offline outbox engine
///
/// ## Dependencies
///
/// - `store`: durable persistence for queue, quarantine, and stats
/// - `remote`: mutation delivery to the hosted backend
/// - `connectivity`: network reachability observation
/// - `identity`: signed-in user observation (captured per enqueue)
pub struct SyncEngine {
    store: Arc<dyn IOutboxStore>,
    remote: Arc<dyn IRemoteAdapter>,
    connectivity: Arc<dyn IConnectivityProvider>,
    identity: Arc<dyn IIdentityProvider>,
    /// Queue, quarantine, and stats under one lock
    state: Mutex<OutboxState>,
    /// Runtime-mutable settings
    config: RwLock<SyncConfig>,
    /// Flush mutual exclusion flag
    is_syncing: AtomicBool,
    /// Observer broadcast channel
    events: broadcast::Sender<SyncEvent>,
    /// Scheduler settings, republished on every config change
    settings_tx: watch::Sender<SchedulerSettings>,
    /// Device and client-version metadata stamped onto every enqueue
    metadata: ItemMetadata,
    /// Self-handle for spawning background flushes from `&self`
    weak_self: Weak<SyncEngine>,
}

impl SyncEngine {
    /// Creates a new engine with the given dependencies
    ///
    /// # Arguments
    /// * `store` - Outbox persistence (IOutboxStore)
    /// * `remote` - Backend delivery (IRemoteAdapter)
    /// * `connectivity` - Reachability observation (IConnectivityProvider)
    /// * `identity` - Signed-in user observation (IIdentityProvider)
    /// * `config` - Initial sync settings
    /// * `metadata` - Device/client metadata for enqueued mutations
    pub fn new(
        store: Arc<dyn IOutboxStore>,
        remote: Arc<dyn IRemoteAdapter>,
        connectivity: Arc<dyn IConnectivityProvider>,
        identity: Arc<dyn IIdentityProvider>,
        config: SyncConfig,
        metadata: ItemMetadata,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (settings_tx, _) = watch::channel(SchedulerSettings::from(&config));

        Arc::new_cyclic(|weak_self| Self {
            store,
            remote,
            connectivity,
            identity,
            state: Mutex::new(OutboxState {
                queue: Vec::new(),
                failed: Vec::new(),
                stats: SyncStats::default(),
            }),
            config: RwLock::new(config),
            is_syncing: AtomicBool::new(false),
            events,
            settings_tx,
            metadata,
            weak_self: weak_self.clone(),
        })
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Loads the persisted outbox state
    ///
    /// Called once at startup before the monitor and scheduler are spawned.
    /// A store that holds nothing (or only undecodable documents) yields an
    /// empty outbox.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> Result<()> {
        let queue = self
            .store
            .load_queue()
            .await
            .context("Failed to load pending queue")?;
        let mut failed = self
            .store
            .load_failed()
            .await
            .context("Failed to load quarantine list")?;

        // A crash between the two saves of a manual retry can leave an id
        // on disk in both documents; the pending copy wins so the
        // uniqueness invariant holds from the first moment.
        failed.retain(|quarantined| {
            let duplicated = queue.iter().any(|item| item.id() == quarantined.id());
            if duplicated {
                warn!(id = %quarantined.id(), "Dropping quarantine copy of a pending mutation");
            }
            !duplicated
        });
        let stats = self
            .store
            .load_stats()
            .await
            .context("Failed to load sync stats")?;

        let mut state = self.state.lock().await;
        state.queue = queue;
        state.failed = failed;
        state.stats = stats;

        info!(
            pending = state.queue.len(),
            failed = state.failed.len(),
            success_count = state.stats.success_count,
            "Outbox state loaded"
        );

        Ok(())
    }

    // ========================================================================
    // Enqueue
    // ========================================================================

    /// Appends a mutation to the pending queue
    ///
    /// The item is persisted before this method returns; a storage failure
    /// is surfaced to the caller and the in-memory append is rolled back,
    /// so the caller knows the write is NOT safe. When online with
    /// auto-sync enabled, a flush is spawned opportunistically.
    ///
    /// # Arguments
    /// * `action` - The kind of write
    /// * `collection` - Target record type name
    /// * `payload` - Opaque mutation data
    /// * `source` - Optional free-form source tag
    ///
    /// # Errors
    /// Returns `SyncError::Domain` for an invalid collection name, or
    /// `SyncError::Storage` when the queue cannot be persisted.
    #[tracing::instrument(skip(self, payload))]
    pub async fn enqueue(
        &self,
        action: MutationAction,
        collection: &str,
        payload: Value,
        source: Option<&str>,
    ) -> std::result::Result<QueueItem, SyncError> {
        let collection = Collection::new(collection.to_string())?;

        // Identity capture never blocks the enqueue path; an unresolved
        // user simply leaves owner_id empty.
        let owner_id = self.identity.current_user().await;

        let mut metadata = self.metadata.clone();
        if let Some(source) = source {
            metadata = metadata.with_source(source);
        }

        let item = QueueItem::new(action, collection, payload, owner_id, metadata);

        {
            let mut state = self.state.lock().await;
            state.queue.push(item.clone());

            if let Err(err) = self.store.save_queue(&state.queue).await {
                state.queue.pop();
                warn!(error = %err, "Failed to persist enqueued mutation, rolling back");
                return Err(SyncError::Storage(err.to_string()));
            }

            debug!(
                id = %item.id(),
                action = %item.action(),
                collection = %item.collection(),
                pending = state.queue.len(),
                "Mutation enqueued"
            );
        }

        self.emit(SyncEvent::ItemQueued(item.clone()));

        let auto_sync = self.config.read().await.auto_sync_enabled;
        if auto_sync && self.connectivity.is_online().await {
            self.spawn_flush();
        }

        Ok(item)
    }

    // ========================================================================
    // Flush
    // ========================================================================

    /// Runs a flush cycle now, if none is in flight
    ///
    /// A second flush requested while one is running returns immediately
    /// with a zero [`SyncOutcome`]; callers that need the cycle's results
    /// must wait for the in-flight one to finish and call again. A flush
    /// is also a no-op while offline or with an empty queue.
    #[tracing::instrument(skip(self))]
    pub async fn force_sync(&self) -> Result<SyncOutcome> {
        if self
            .is_syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Flush already in progress, request rejected");
            return Ok(SyncOutcome::default());
        }

        let result = self.run_flush().await;
        self.is_syncing.store(false, Ordering::Release);

        match result {
            Ok(outcome) => {
                self.emit(SyncEvent::Status(EngineStatus::Idle));
                Ok(outcome)
            }
            Err(err) => {
                // The in-memory queue is never lost on an aborted cycle;
                // unprocessed items wait for the next flush.
                error!(error = %err, "Flush cycle aborted");
                self.emit(SyncEvent::Status(EngineStatus::Error));
                self.emit(SyncEvent::Status(EngineStatus::Idle));
                Err(err)
            }
        }
    }

    /// Spawns a flush on the runtime without awaiting it
    ///
    /// Used by the scheduler, the network monitor, and opportunistic
    /// post-enqueue triggers. Errors are logged, not propagated.
    pub fn spawn_flush(&self) {
        let Some(engine) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(err) = engine.force_sync().await {
                error!(error = %err, "Background flush failed");
            }
        });
    }

    /// The flush cycle body; the caller holds the `is_syncing` flag
    async fn run_flush(&self) -> Result<SyncOutcome> {
        let start = std::time::Instant::now();
        let mut outcome = SyncOutcome::default();

        if !self.connectivity.is_online().await {
            debug!("Offline, skipping flush");
            return Ok(outcome);
        }

        let config = self.config.read().await.clone();

        // Snapshot the cycle's work up front. Items enqueued after this
        // point wait for the next cycle; items re-queued by a failure in
        // this cycle are not retried until the next cycle either.
        let batches: Vec<Vec<MutationId>> = {
            let state = self.state.lock().await;
            state
                .queue
                .chunks(config.batch_size)
                .map(|chunk| chunk.iter().map(|item| item.id().clone()).collect())
                .collect()
        };

        if batches.is_empty() {
            debug!("Queue empty, nothing to flush");
            return Ok(outcome);
        }

        self.emit(SyncEvent::Status(EngineStatus::Syncing));
        info!(
            batches = batches.len(),
            batch_size = config.batch_size,
            "Starting flush cycle"
        );

        for (index, batch_ids) in batches.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
            }
            self.flush_batch(batch_ids, &config, &mut outcome).await?;
        }

        {
            let mut state = self.state.lock().await;
            state.stats.mark_sync_completed(Utc::now());
            self.store
                .save_stats(&state.stats)
                .await
                .context("Failed to persist stats after flush")?;
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            success = outcome.success,
            failures = outcome.failures,
            duration_ms = outcome.duration_ms,
            "Flush cycle completed"
        );

        Ok(outcome)
    }

    /// Dispatches one batch concurrently and applies its outcomes
    async fn flush_batch(
        &self,
        batch_ids: &[MutationId],
        config: &SyncConfig,
        outcome: &mut SyncOutcome,
    ) -> Result<()> {
        // Fetch the current version of each item; earlier batches may
        // have remapped ids inside these payloads, and an item may have
        // been removed from the queue since the snapshot was taken.
        let items: Vec<QueueItem> = {
            let state = self.state.lock().await;
            batch_ids
                .iter()
                .filter_map(|id| state.queue.iter().find(|item| item.id() == id).cloned())
                .collect()
        };

        if items.is_empty() {
            return Ok(());
        }

        let mut tasks: JoinSet<(QueueItem, DispatchResult)> = JoinSet::new();
        for item in items {
            let remote = Arc::clone(&self.remote);
            let delay = backoff_delay(config.retry_delay_ms, item.retry_count());
            tasks.spawn(async move {
                if !delay.is_zero() {
                    debug!(
                        id = %item.id(),
                        retry_count = item.retry_count(),
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                let result = dispatch_item(remote.as_ref(), &item).await;
                (item, result)
            });
        }

        // Drain every dispatch task before touching shared state; the
        // lock is held only to apply outcomes, never across remote I/O
        // or backoff sleeps, so status and enqueue stay responsive while
        // a slow batch is in flight.
        let mut results: Vec<(QueueItem, DispatchResult)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            results.push(joined.context("Dispatch task panicked")?);
        }

        let mut state = self.state.lock().await;
        for (item, result) in results {
            match result {
                Ok(canonical_id) => {
                    state.queue.retain(|pending| pending.id() != item.id());
                    state.stats.record_success();
                    outcome.success += 1;

                    // Learn the canonical id of a created record and
                    // rewrite references to its temporary id in every
                    // still-pending payload.
                    if let Some(canonical) = canonical_id {
                        if let Some(local) = local_payload_id(item.payload()) {
                            let mut remapped = 0usize;
                            for pending in state.queue.iter_mut() {
                                if pending.remap_id(&local, &canonical) {
                                    remapped += 1;
                                }
                            }
                            if remapped > 0 {
                                info!(
                                    local_id = %local,
                                    canonical_id = %canonical,
                                    items = remapped,
                                    "Remapped local id in pending payloads"
                                );
                            }
                        }
                    }

                    debug!(id = %item.id(), "Mutation delivered");
                    self.emit(SyncEvent::ItemSucceeded(item));
                }
                Err(detail) => {
                    state.stats.record_failure();
                    outcome.failures += 1;

                    let position = state
                        .queue
                        .iter()
                        .position(|pending| pending.id() == item.id());
                    let Some(position) = position else {
                        // Removed by an operator while in flight
                        debug!(id = %item.id(), "Failed item no longer queued, dropping outcome");
                        continue;
                    };

                    state.queue[position].record_attempt();
                    let retry_count = state.queue[position].retry_count();

                    if retry_count >= config.max_retries {
                        let exhausted = state.queue.remove(position);
                        warn!(
                            id = %exhausted.id(),
                            retry_count,
                            error = %detail,
                            "Retries exhausted, quarantining mutation"
                        );
                        self.emit(SyncEvent::ItemFailed(exhausted.clone(), detail.clone()));
                        state.failed.push(FailedItem::quarantine(exhausted, detail));
                    } else {
                        // Still retryable; the item stays queued and no
                        // failure event fires until retries are exhausted
                        warn!(
                            id = %item.id(),
                            retry_count,
                            max_retries = config.max_retries,
                            error = %detail,
                            "Delivery failed, will retry"
                        );
                    }
                }
            }
        }

        // Persist all three documents so a crash between batches never
        // replays more than one batch worth of outcomes.
        self.store
            .save_queue(&state.queue)
            .await
            .context("Failed to persist queue after batch")?;
        self.store
            .save_failed(&state.failed)
            .await
            .context("Failed to persist quarantine after batch")?;
        self.store
            .save_stats(&state.stats)
            .await
            .context("Failed to persist stats after batch")?;

        Ok(())
    }

    // ========================================================================
    // Status and snapshots
    // ========================================================================

    /// Returns a point-in-time status snapshot
    pub async fn status(&self) -> SyncStatus {
        let online = self.connectivity.is_online().await;
        let state = self.state.lock().await;
        SyncStatus {
            pending: state.queue.len(),
            failed: state.failed.len(),
            online,
            syncing: self.is_syncing.load(Ordering::Acquire),
            last_sync_at: state.stats.last_sync_at,
            success_count: state.stats.success_count,
            failure_count: state.stats.failure_count,
        }
    }

    /// Returns a snapshot of the pending queue
    pub async fn queue(&self) -> Vec<QueueItem> {
        self.state.lock().await.queue.clone()
    }

    /// Returns a snapshot of the quarantine lane
    pub async fn failed_items(&self) -> Vec<FailedItem> {
        self.state.lock().await.failed.clone()
    }

    /// Returns whether a flush cycle is in progress
    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::Acquire)
    }

    // ========================================================================
    // Queue and quarantine management
    // ========================================================================

    /// Moves a quarantined mutation back to the pending queue
    ///
    /// The retry counter resets to zero so the item earns a full set of
    /// automatic attempts again. Spawns a flush when online. Returns false
    /// when no quarantined item has the given id.
    #[tracing::instrument(skip(self))]
    pub async fn retry_failed_item(&self, id: &MutationId) -> Result<bool> {
        let released = {
            let mut state = self.state.lock().await;
            let Some(position) = state.failed.iter().position(|f| f.id() == id) else {
                return Ok(false);
            };

            let failed = state.failed.remove(position);
            let item = failed.clone().release();
            state.queue.push(item);

            let persisted = async {
                self.store.save_queue(&state.queue).await?;
                self.store.save_failed(&state.failed).await
            }
            .await;

            if let Err(err) = persisted {
                // Undo the move so memory and disk stay in agreement
                state.queue.pop();
                state.failed.insert(position, failed);
                return Err(err.context("Failed to persist manual retry"));
            }

            info!(id = %id, "Quarantined mutation returned to queue");
            true
        };

        if released && self.connectivity.is_online().await {
            self.spawn_flush();
        }

        Ok(released)
    }

    /// Empties the quarantine lane, returning how many items were dropped
    #[tracing::instrument(skip(self))]
    pub async fn clear_failed_items(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let dropped = state.failed.len();
        state.failed.clear();
        self.store
            .save_failed(&state.failed)
            .await
            .context("Failed to persist cleared quarantine")?;
        info!(dropped, "Quarantine cleared");
        Ok(dropped)
    }

    /// Removes a pending mutation without delivering it
    ///
    /// Returns false when no pending item has the given id.
    #[tracing::instrument(skip(self))]
    pub async fn remove_from_queue(&self, id: &MutationId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.queue.len();
        state.queue.retain(|item| item.id() != id);
        if state.queue.len() == before {
            return Ok(false);
        }

        self.store
            .save_queue(&state.queue)
            .await
            .context("Failed to persist queue after removal")?;
        info!(id = %id, "Mutation removed from queue");
        Ok(true)
    }

    /// Wipes the queue, the quarantine, and the stats
    ///
    /// An operator-only reset; queued work is lost permanently.
    #[tracing::instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.queue.clear();
        state.failed.clear();
        state.stats = SyncStats::default();

        self.store
            .save_queue(&state.queue)
            .await
            .context("Failed to persist cleared queue")?;
        self.store
            .save_failed(&state.failed)
            .await
            .context("Failed to persist cleared quarantine")?;
        self.store
            .save_stats(&state.stats)
            .await
            .context("Failed to persist cleared stats")?;

        warn!("Outbox fully cleared");
        Ok(())
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Returns the current configuration
    pub async fn config(&self) -> SyncConfig {
        self.config.read().await.clone()
    }

    /// Applies a partial configuration update at runtime
    ///
    /// Scheduler-relevant changes (`sync_interval_ms`, `auto_sync_enabled`)
    /// are republished so the running scheduler re-arms its single timer.
    ///
    /// # Errors
    /// Returns an error listing every validation failure; an invalid patch
    /// changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn update_config(&self, patch: SyncConfigPatch) -> Result<SyncConfig> {
        let mut config = self.config.write().await;
        let merged = patch.apply(&config);

        let errors = merged.validate();
        if !errors.is_empty() {
            let summary = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::bail!("Invalid configuration: {summary}");
        }

        *config = merged.clone();
        self.settings_tx.send_replace(SchedulerSettings::from(&merged));

        info!(
            max_retries = merged.max_retries,
            sync_interval_ms = merged.sync_interval_ms,
            batch_size = merged.batch_size,
            retry_delay_ms = merged.retry_delay_ms,
            auto_sync_enabled = merged.auto_sync_enabled,
            "Configuration updated"
        );

        Ok(merged)
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Registers an observer for engine events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Returns a receiver tracking the scheduler-relevant settings
    pub fn scheduler_settings(&self) -> watch::Receiver<SchedulerSettings> {
        self.settings_tx.subscribe()
    }

    /// Sends an event to observers; absent observers are not an error
    pub(crate) fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn connectivity(&self) -> Arc<dyn IConnectivityProvider> {
        Arc::clone(&self.connectivity)
    }

    pub(crate) fn identity(&self) -> Arc<dyn IIdentityProvider> {
        Arc::clone(&self.identity)
    }
}

// ============================================================================
// Dispatch helpers
// ============================================================================

/// Computes the pre-dispatch delay for an item
///
/// First attempts go immediately; an item with `retry_count` prior
/// failures waits `min(retry_delay_ms * 2^(retry_count-1), 30s)`.
fn backoff_delay(retry_delay_ms: u64, retry_count: u32) -> Duration {
    if retry_count == 0 {
        return Duration::ZERO;
    }
    let exponent = (retry_count - 1).min(16);
    let delay_ms = retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}

/// Returns the canonical target id of an update or delete payload
fn payload_target_id(payload: &Value) -> Option<String> {
    payload
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Returns the payload's `id` when it is a temporary local id
fn local_payload_id(payload: &Value) -> Option<String> {
    payload_target_id(payload).filter(|id| MutationId::is_local_str(id))
}

/// Removes fields a client may never patch from an update payload
fn sanitize_patch(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => {
            let filtered = map
                .iter()
                .filter(|(key, _)| !IMMUTABLE_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Value::Object(filtered)
        }
        other => other.clone(),
    }
}

/// Maps a remote failure into the diagnostic captured on the item
fn remote_error_detail(err: RemoteError) -> ErrorDetail {
    match err {
        RemoteError::Failed {
            message,
            code,
            details,
        } => ErrorDetail {
            message,
            code,
            details,
        },
        other => ErrorDetail::new(other.to_string()),
    }
}

/// Delivers a single mutation to the backend
///
/// Applies the idempotence rules for replayed mutations: a create that
/// hits an existing record and a delete that finds nothing both count as
/// delivered, because the intended end state already holds.
async fn dispatch_item(remote: &dyn IRemoteAdapter, item: &QueueItem) -> DispatchResult {
    let collection = item.collection().as_str();

    match item.action() {
        MutationAction::Create => match remote.insert(collection, item.payload()).await {
            Ok(row) => Ok(row
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)),
            Err(RemoteError::Conflict(id)) => {
                // Replay of an already-delivered create. No canonical id
                // is learned, so no remap happens for this item.
                debug!(id = %id, "Create conflict treated as delivered");
                Ok(None)
            }
            Err(err) => Err(remote_error_detail(err)),
        },
        MutationAction::Update => {
            let Some(target) = payload_target_id(item.payload()) else {
                return Err(ErrorDetail::new("Update payload has no id field"));
            };
            let patch = sanitize_patch(item.payload());
            match remote.update(collection, &target, &patch).await {
                Ok(()) => Ok(None),
                Err(err) => Err(remote_error_detail(err)),
            }
        }
        MutationAction::Delete => {
            let Some(target) = payload_target_id(item.payload()) else {
                return Err(ErrorDetail::new("Delete payload has no id field"));
            };
            match remote.delete(collection, &target).await {
                Ok(()) => Ok(None),
                Err(RemoteError::NotFound(id)) => {
                    debug!(id = %id, "Delete of missing record treated as delivered");
                    Ok(None)
                }
                Err(err) => Err(remote_error_detail(err)),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
