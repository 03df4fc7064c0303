//! Read-only snapshot endpoints, one per fleet collection.
//!
//! These run the same canonical queries the broadcast engine runs; the
//! response body matches the `${x}Update` payload so dashboards can share
//! one decoding path between REST and the push channel.

use axum::extract::State;
use axum::Json;

use fleetpulse_core::resource::ResourceKind;
use fleetpulse_realtime::message::outbound;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/vehicles
pub async fn vehicles(state: State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    fetch_collection(state, ResourceKind::Vehicles).await
}

/// GET /api/drivers
pub async fn drivers(state: State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    fetch_collection(state, ResourceKind::Drivers).await
}

/// GET /api/rides
pub async fn rides(state: State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    fetch_collection(state, ResourceKind::Rides).await
}

/// GET /api/admins
pub async fn admins(state: State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    fetch_collection(state, ResourceKind::Admins).await
}

/// GET /api/complaints
pub async fn complaints(state: State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    fetch_collection(state, ResourceKind::Complaints).await
}

/// GET /api/dashboard/stats
pub async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.snapshots.fetch_dashboard().await?;
    Ok(Json(stats))
}

async fn fetch_collection(
    State(state): State<AppState>,
    kind: ResourceKind,
) -> Result<Json<serde_json::Value>, ApiError> {
    let docs = state.snapshots.fetch(kind).await?;
    Ok(Json(outbound::success_payload(
        serde_json::Value::Array(docs),
        None,
    )))
}
