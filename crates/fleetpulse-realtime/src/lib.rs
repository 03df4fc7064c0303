//! # fleetpulse-realtime
//!
//! Real-time engine for FleetPulse. Provides:
//!
//! - Change watching with reconnecting subscriptions and polling fallback
//! - Validate-before-send broadcasts with cached-last-good fallback
//! - Personalized per-client report computation and periodic re-push
//! - Client registry, room membership, and stale-session eviction

pub mod broadcast;
pub mod cache;
pub mod connection;
pub mod lifecycle;
pub mod message;
pub mod reports;
pub mod rooms;
pub mod server;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testutil;

pub use broadcast::{BroadcastEngine, Trigger};
pub use cache::{CacheKey, CachedPayload, PayloadCache};
pub use connection::registry::ClientRegistry;
pub use lifecycle::ConnectionLifecycle;
pub use reports::ReportEngine;
pub use rooms::RoomRegistry;
pub use server::RealtimeEngine;
pub use watcher::ChangeWatcher;
