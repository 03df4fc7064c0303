//! Route definitions for the FleetPulse HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`; the
//! WebSocket upgrade lives at the root. The router receives `AppState`
//! and passes it to all handlers via Axum's `State` extractor.

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(health_routes())
        .merge(resource_routes())
        .merge(report_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    let cors = build_cors_layer(&state);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health endpoint.
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Read-only collection snapshots plus dashboard stats.
fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(handlers::resources::vehicles))
        .route("/drivers", get(handlers::resources::drivers))
        .route("/rides", get(handlers::resources::rides))
        .route("/admins", get(handlers::resources::admins))
        .route("/complaints", get(handlers::resources::complaints))
        .route("/dashboard/stats", get(handlers::resources::dashboard_stats))
}

/// Report endpoints.
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/earnings", get(handlers::reports::earnings))
        .route(
            "/reports/driver-performance",
            get(handlers::reports::driver_performance),
        )
        .route(
            "/reports/rides-analysis",
            get(handlers::reports::rides_analysis),
        )
        .route("/reports/summary", get(handlers::reports::summary))
}

/// CORS layer from configuration.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    use axum::http::{HeaderValue, Method};
    use tower_http::cors::{Any, AllowOrigin};

    let cors_config = &state.config.server.cors;
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if cors_config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(AllowOrigin::list(origins));
    }

    cors
}
