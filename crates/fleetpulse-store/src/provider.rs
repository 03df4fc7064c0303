//! SQL-backed snapshot provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use fleetpulse_core::report::{ChangePolicy, ReportFilters};
use fleetpulse_core::resource::{ReportKind, ResourceKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_core::traits::SnapshotSource;

use crate::queries::{dashboard, reports, resources};

/// PostgreSQL implementation of [`SnapshotSource`].
///
/// Stateless beyond the pool: every call runs the canonical query fresh so
/// concurrent callers always see the store's current state.
#[derive(Debug, Clone)]
pub struct SqlSnapshotProvider {
    pool: PgPool,
    policy: ChangePolicy,
}

impl SqlSnapshotProvider {
    /// Create a provider over an existing pool.
    pub fn new(pool: PgPool, policy: ChangePolicy) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl SnapshotSource for SqlSnapshotProvider {
    async fn fetch(&self, kind: ResourceKind) -> AppResult<Vec<serde_json::Value>> {
        let docs = match kind {
            ResourceKind::Vehicles => resources::list_vehicles(&self.pool)
                .await?
                .iter()
                .map(|row| row.wire())
                .collect(),
            ResourceKind::Drivers => resources::list_drivers(&self.pool)
                .await?
                .iter()
                .map(|row| row.wire())
                .collect(),
            ResourceKind::Rides => resources::list_rides(&self.pool)
                .await?
                .iter()
                .map(|row| row.wire())
                .collect(),
            ResourceKind::Admins => resources::list_admins(&self.pool)
                .await?
                .iter()
                .map(|row| row.wire())
                .collect(),
            ResourceKind::Complaints => resources::list_complaints(&self.pool)
                .await?
                .iter()
                .map(|row| row.wire())
                .collect(),
        };
        Ok(docs)
    }

    async fn fetch_report(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> AppResult<serde_json::Value> {
        let value = match kind {
            ReportKind::Earnings => {
                serde_json::to_value(reports::earnings(&self.pool, filters).await?)?
            }
            ReportKind::DriverPerformance => {
                serde_json::to_value(reports::driver_performance(&self.pool, filters).await?)?
            }
            ReportKind::RidesAnalysis => {
                serde_json::to_value(reports::rides_analysis(&self.pool, filters).await?)?
            }
            ReportKind::ReportsSummary => {
                serde_json::to_value(reports::summary(&self.pool, filters, &self.policy).await?)?
            }
        };
        Ok(value)
    }

    async fn fetch_dashboard(&self) -> AppResult<serde_json::Value> {
        let stats = dashboard::dashboard_stats(&self.pool, &self.policy).await?;
        Ok(serde_json::to_value(stats)?)
    }

    async fn latest_modified(&self, kind: ResourceKind) -> AppResult<Option<DateTime<Utc>>> {
        resources::latest_modified(&self.pool, kind).await
    }
}
