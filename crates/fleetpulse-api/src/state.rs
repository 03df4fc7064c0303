//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use fleetpulse_core::config::AppConfig;
use fleetpulse_core::traits::SnapshotSource;
use fleetpulse_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped (or pooled) for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Database pool.
    pub db_pool: PgPool,
    /// Snapshot provider (same instance the engines use).
    pub snapshots: Arc<dyn SnapshotSource>,
    /// Real-time engine.
    pub realtime: Arc<RealtimeEngine>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
