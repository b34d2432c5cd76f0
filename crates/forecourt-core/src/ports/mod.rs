//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteAdapter`] - Mutation delivery to the hosted backend
//! - [`IOutboxStore`] - Durable persistence for queue, quarantine, stats
//! - [`IConnectivityProvider`] - Network reachability observation
//! - [`IIdentityProvider`] - Signed-in user observation

pub mod connectivity;
pub mod outbox_store;
pub mod remote_adapter;

pub use connectivity::{IConnectivityProvider, IIdentityProvider};
pub use outbox_store::IOutboxStore;
pub use remote_adapter::{IRemoteAdapter, RemoteError};
