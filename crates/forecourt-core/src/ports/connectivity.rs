//! Connectivity and identity ports (driven/secondary ports)
//!
//! This module defines the interfaces through which the sync engine
//! observes the outside world: whether the device currently has network
//! reachability, and whether a user identity has been resolved. Both are
//! push-based via `tokio::sync::watch` channels so the network monitor
//! can react to transitions instead of polling.
//!
//! ## Design Notes
//!
//! - `watch` channels always hold a current value, so a fresh subscriber
//!   immediately sees the present state without waiting for an edge.
//! - Flushes gate on connectivity alone. The identity-ready signal is a
//!   trigger edge that prompts a flush attempt; the resolved user is
//!   captured per enqueued mutation, not checked at dispatch time.

use tokio::sync::watch;

/// Port trait for observing network reachability
#[async_trait::async_trait]
pub trait IConnectivityProvider: Send + Sync {
    /// Returns the current reachability state
    async fn is_online(&self) -> bool;

    /// Returns a receiver that tracks reachability transitions
    ///
    /// The receiver's current value is the present state; every change
    /// of state publishes a new value.
    fn watch(&self) -> watch::Receiver<bool>;
}

/// Port trait for observing the signed-in user
#[async_trait::async_trait]
pub trait IIdentityProvider: Send + Sync {
    /// Returns the id of the signed-in user, if any
    async fn current_user(&self) -> Option<String>;

    /// Returns a receiver that tracks sign-in/sign-out transitions
    ///
    /// The value is `true` while a user identity is resolved.
    fn watch_ready(&self) -> watch::Receiver<bool>;
}
