//! Forecourt Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `QueueItem`, `FailedItem`, `SyncStats`
//! - **Validated newtypes** - `MutationId`, `Collection`
//! - **Port definitions** - Traits for adapters: `IRemoteAdapter`,
//!   `IOutboxStore`, `IConnectivityProvider`, `IIdentityProvider`
//! - **Configuration** - Runtime-mutable sync settings with YAML loading
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! The sync engine orchestrates domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
