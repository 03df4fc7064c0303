//! Last-good payload cache.
//!
//! One entry per broadcast key, written only with payloads that already
//! passed their validation predicate. Used to seed newly joined observers
//! and as the fallback when a fresh computation fails. Never rolled back.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

use fleetpulse_core::resource::{ReportKind, ResourceKind};

/// Identifies one cached broadcast payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A collection's `${x}Update` payload.
    Resource(ResourceKind),
    /// A report kind's latest globally-validated payload.
    Report(ReportKind),
    /// The dashboard stats payload.
    Dashboard,
}

/// A validated payload with its computation time.
#[derive(Debug, Clone)]
pub struct CachedPayload {
    /// The payload exactly as broadcast.
    pub payload: Value,
    /// When the payload passed validation.
    pub updated_at: DateTime<Utc>,
}

/// In-process cache of the most recent validated payload per key.
#[derive(Debug, Default)]
pub struct PayloadCache {
    entries: DashMap<CacheKey, CachedPayload>,
}

impl PayloadCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a payload that passed validation.
    pub fn store(&self, key: CacheKey, payload: Value) {
        self.entries.insert(
            key,
            CachedPayload {
                payload,
                updated_at: Utc::now(),
            },
        );
    }

    /// The last validated payload for a key, if any.
    pub fn get(&self, key: CacheKey) -> Option<CachedPayload> {
        self.entries.get(&key).map(|entry| entry.value().clone())
    }

    /// Whether a key has ever been populated.
    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries.contains_key(&key)
    }
}
