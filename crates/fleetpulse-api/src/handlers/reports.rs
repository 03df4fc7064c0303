//! Report endpoints.
//!
//! Query parameters are validated exactly like the socket path; malformed
//! parameters are a 400 for this request only. A failed or invalid
//! computation falls back to the engine's last-good cache, then to the
//! zeroed placeholder, matching the policy the push channel applies.

use axum::extract::{Query, State};
use axum::Json;

use fleetpulse_core::report::{RawReportParams, ReportFilters};
use fleetpulse_core::resource::ReportKind;
use fleetpulse_realtime::CacheKey;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/reports/earnings
pub async fn earnings(
    state: State<AppState>,
    params: Query<RawReportParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    report(state, ReportKind::Earnings, params).await
}

/// GET /api/reports/driver-performance
pub async fn driver_performance(
    state: State<AppState>,
    params: Query<RawReportParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    report(state, ReportKind::DriverPerformance, params).await
}

/// GET /api/reports/rides-analysis
pub async fn rides_analysis(
    state: State<AppState>,
    params: Query<RawReportParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    report(state, ReportKind::RidesAnalysis, params).await
}

/// GET /api/reports/summary
pub async fn summary(
    state: State<AppState>,
    params: Query<RawReportParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    report(state, ReportKind::ReportsSummary, params).await
}

async fn report(
    State(state): State<AppState>,
    kind: ReportKind,
    Query(params): Query<RawReportParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filters = ReportFilters::parse(&params, kind, state.config.reports.max_range_days)?;

    match state.snapshots.fetch_report(kind, &filters).await {
        Ok(payload) if kind.validate(&payload) => {
            state
                .realtime
                .cache
                .store(CacheKey::Report(kind), payload.clone());
            Ok(Json(payload))
        }
        Ok(_) => {
            tracing::warn!(report = %kind, "Report payload failed validation, serving cache");
            Ok(Json(cached_or_placeholder(&state, kind)))
        }
        Err(e) => {
            tracing::warn!(report = %kind, error = %e, "Report query failed, serving cache");
            Ok(Json(cached_or_placeholder(&state, kind)))
        }
    }
}

fn cached_or_placeholder(state: &AppState, kind: ReportKind) -> serde_json::Value {
    state
        .realtime
        .cache
        .get(CacheKey::Report(kind))
        .map(|cached| cached.payload)
        .unwrap_or_else(|| kind.placeholder())
}
