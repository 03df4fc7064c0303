//! # fleetpulse-store
//!
//! PostgreSQL implementation of the FleetPulse trait seams:
//!
//! - Connection pool management and migrations
//! - Canonical per-collection snapshot queries (the Snapshot Provider)
//! - Report and dashboard aggregations
//! - `LISTEN/NOTIFY`-backed change subscriptions

pub mod connection;
pub mod listener;
pub mod migration;
pub mod provider;
pub mod queries;

pub use listener::PgChangeSource;
pub use provider::SqlSnapshotProvider;
