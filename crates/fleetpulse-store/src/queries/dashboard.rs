//! Dashboard headline stats query.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::report::filters::{end_of_day, start_of_day};
use fleetpulse_core::report::payload::DashboardStats;
use fleetpulse_core::report::ChangePolicy;
use fleetpulse_core::result::AppResult;

use super::reports::{period_totals, round2};

/// Today's headline stats with deltas against yesterday, plus driver
/// counts with week-over-week growth.
pub async fn dashboard_stats(pool: &PgPool, policy: &ChangePolicy) -> AppResult<DashboardStats> {
    let now = Utc::now();
    let yesterday = now - Duration::days(1);

    let today = period_totals(pool, start_of_day(now), end_of_day(now)).await?;
    let prior = period_totals(pool, start_of_day(yesterday), end_of_day(yesterday)).await?;

    let total_drivers = count_drivers_online(pool).await?;

    let week_start = start_of_day(now - Duration::days(7));
    let prev_week_start = start_of_day(now - Duration::days(14));
    let new_this_week = count_drivers_joined(pool, week_start, now).await?;
    let new_prev_week = count_drivers_joined(pool, prev_week_start, week_start).await?;

    Ok(DashboardStats {
        today_rides: today.total_rides,
        rides_change: policy.percent_change(today.total_rides as f64, prior.total_rides as f64),
        today_income: round2(today.total_earnings),
        income_change: policy.percent_change(today.total_earnings, prior.total_earnings),
        completed_today: today.completed,
        cancelled_today: today.cancelled,
        total_drivers,
        new_drivers_this_week: new_this_week,
        driver_growth: policy.percent_change(new_this_week as f64, new_prev_week as f64),
        timestamp: now,
    })
}

async fn count_drivers_online(pool: &PgPool) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM drivers WHERE is_online")
        .fetch_one(pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count online drivers", e)
        })
}

async fn count_drivers_joined(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM drivers WHERE joined_at >= $1 AND joined_at < $2 AND is_online",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count new drivers", e))
}
