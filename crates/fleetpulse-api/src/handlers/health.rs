//! Health check handler.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connectedClients": state.realtime.connection_count(),
        "timestamp": Utc::now(),
    }))
}
