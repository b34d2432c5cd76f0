//! Network and identity monitor
//!
//! The [`NetworkMonitor`] watches connectivity and identity transitions
//! and turns them into engine activity:
//!
//! ```text
//! connectivity watch ──┐
//!                      ├──→ NetworkMonitor ──→ status events + flush
//! identity watch ──────┘
//! ```
//!
//! Going online (or an identity becoming ready while online) spawns a
//! flush; going offline only reports status. An in-flight flush is never
//! cancelled by an offline transition, the cycle's own connectivity
//! checks and failures handle the loss.

use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::SyncEngine;
use crate::events::{EngineStatus, SyncEvent};

/// Watches connectivity and identity and drives the engine on transitions
pub struct NetworkMonitor {
    engine: Arc<SyncEngine>,
}

impl NetworkMonitor {
    /// Creates a monitor bound to an engine
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Main event loop
    ///
    /// Runs until both watch senders are dropped (the providers shut
    /// down). Each connectivity edge emits a status event; online edges
    /// and identity-ready edges additionally spawn a flush.
    pub async fn run(&self) {
        let mut online_rx = self.engine.connectivity().watch();
        let mut identity_rx = self.engine.identity().watch_ready();

        info!("Network monitor starting");

        let mut online_closed = false;
        let mut identity_closed = false;

        while !(online_closed && identity_closed) {
            tokio::select! {
                changed = online_rx.changed(), if !online_closed => {
                    match changed {
                        Ok(()) => {
                            let online = *online_rx.borrow_and_update();
                            if online {
                                info!("Connectivity restored");
                                self.engine.emit(SyncEvent::Status(EngineStatus::Online));
                                self.engine.spawn_flush();
                            } else {
                                info!("Connectivity lost");
                                self.engine.emit(SyncEvent::Status(EngineStatus::Offline));
                            }
                        }
                        Err(_) => {
                            debug!("Connectivity watch closed");
                            online_closed = true;
                        }
                    }
                }

                changed = identity_rx.changed(), if !identity_closed => {
                    match changed {
                        Ok(()) => {
                            let ready = *identity_rx.borrow_and_update();
                            if ready {
                                info!("Identity ready, attempting flush");
                                self.engine.spawn_flush();
                            }
                        }
                        Err(_) => {
                            debug!("Identity watch closed");
                            identity_closed = true;
                        }
                    }
                }
            }
        }

        info!("Network monitor stopped");
    }
}
