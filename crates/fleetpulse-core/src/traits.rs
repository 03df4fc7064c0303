//! Core traits defined in `fleetpulse-core` and implemented by other crates.
//!
//! The realtime engines only ever see these seams, so tests can drive them
//! with in-memory fakes and the store crate can swap its change-notification
//! mechanism (LISTEN/NOTIFY today, polling fallback otherwise) without
//! touching the engines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::events::ChangeEvent;
use crate::report::ReportFilters;
use crate::resource::{ReportKind, ResourceKind};
use crate::result::AppResult;

/// Read access to canonical snapshots and report aggregates.
///
/// Safe to call concurrently and frequently; it backs change-triggered,
/// timer-triggered, and per-client report computations. Query failures are
/// returned as errors, never panics, so callers can fall back to cache.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Executes the canonical query for a resource and returns its current
    /// snapshot as an ordered sequence of shaped documents.
    async fn fetch(&self, kind: ResourceKind) -> AppResult<Vec<serde_json::Value>>;

    /// Computes a report aggregate for the given filters.
    async fn fetch_report(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> AppResult<serde_json::Value>;

    /// Computes the dashboard headline stats.
    async fn fetch_dashboard(&self) -> AppResult<serde_json::Value>;

    /// Most recent modification timestamp for a resource, for the polling
    /// fallback. `None` when the collection is empty.
    async fn latest_modified(&self, kind: ResourceKind) -> AppResult<Option<DateTime<Utc>>>;
}

/// A live change subscription for one resource.
#[async_trait]
pub trait ChangeStream: Send {
    /// Waits for the next change. An error means the subscription failed or
    /// closed; the caller tears it down and resubscribes after a fixed delay.
    async fn next_change(&mut self) -> AppResult<ChangeEvent>;
}

/// Factory for change subscriptions.
#[async_trait]
pub trait ChangeSource: Send + Sync + 'static {
    /// Opens a subscription for one resource, requesting full document
    /// bodies where the mechanism can supply them.
    async fn subscribe(&self, kind: ResourceKind) -> AppResult<Box<dyn ChangeStream>>;

    /// Whether the underlying mechanism supports push notifications at all.
    /// When `false`, the watcher goes straight to polling.
    fn supports_streams(&self) -> bool {
        true
    }
}
