//! Report aggregation queries.
//!
//! All windows are resolved by [`ReportFilters`]; the SQL only ever sees
//! concrete timestamps. Series are bucketed in the database (`to_char`
//! over `ride_time`) so the heavy grouping never happens in process.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::report::payload::{
    DateRange, DriverPerformanceReport, DriverPerformanceRow, DriverSlice, EarningsPoint,
    EarningsReport, EarningsSummary, ReportsSummary, RidesAnalysisPoint, RidesAnalysisReport,
    ServiceDistribution,
};
use fleetpulse_core::report::{ChangePolicy, DriverFilter, ReportFilters};
use fleetpulse_core::result::AppResult;

/// Whole-period ride totals, shared by the summary report and the
/// dashboard stats.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct PeriodTotals {
    /// All rides in the period.
    pub total_rides: i64,
    /// Earnings from completed rides.
    pub total_earnings: f64,
    /// Completed rides.
    pub completed: i64,
    /// Cancelled rides.
    pub cancelled: i64,
}

impl PeriodTotals {
    /// Average earning per ride, zero when the period is empty.
    pub fn avg_per_ride(&self) -> f64 {
        if self.total_rides > 0 {
            round2(self.total_earnings / self.total_rides as f64)
        } else {
            0.0
        }
    }

    /// Cancelled share of all rides, percent.
    pub fn cancellation_rate(&self) -> f64 {
        if self.total_rides > 0 {
            round1(self.cancelled as f64 / self.total_rides as f64 * 100.0)
        } else {
            0.0
        }
    }
}

/// Aggregate ride totals for one period.
pub async fn period_totals(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<PeriodTotals> {
    sqlx::query_as::<_, PeriodTotals>(
        "SELECT COUNT(*) AS total_rides, \
                COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0)::float8 \
                    AS total_earnings, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled \
         FROM rides \
         WHERE ride_time >= $1 AND ride_time <= $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to aggregate rides", e))
}

/// Earnings report: bucketed time series plus whole-window totals.
pub async fn earnings(pool: &PgPool, filters: &ReportFilters) -> AppResult<EarningsReport> {
    let now = Utc::now();
    let (start, end) = filters.window(now);
    let hourly = filters.hourly_buckets();
    let bucket_format = if hourly { "HH24" } else { "YYYY-MM-DD" };
    let driver = match filters.driver {
        DriverFilter::All => None,
        DriverFilter::Id(id) => Some(id),
    };

    let rows = sqlx::query_as::<_, (String, f64, i64, i64, i64)>(
        "SELECT to_char(ride_time, $4::text) AS bucket, \
                COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0)::float8 \
                    AS earnings, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled, \
                COUNT(*) AS total \
         FROM rides \
         WHERE ride_time >= $1 AND ride_time <= $2 \
           AND ($3::uuid IS NULL OR driver_id = $3) \
         GROUP BY bucket \
         ORDER BY bucket",
    )
    .bind(start)
    .bind(end)
    .bind(driver)
    .bind(bucket_format)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to aggregate earnings", e))?;

    let mut total_earnings = 0.0;
    let mut total_completed = 0i64;
    let mut total_cancelled = 0i64;
    let mut total_all = 0i64;

    let chart_data: Vec<EarningsPoint> = rows
        .into_iter()
        .map(|(bucket, bucket_earnings, completed, cancelled, total)| {
            total_earnings += bucket_earnings;
            total_completed += completed;
            total_cancelled += cancelled;
            total_all += total;

            let avg = if completed > 0 {
                round2(bucket_earnings / completed as f64)
            } else {
                0.0
            };
            EarningsPoint {
                name: if hourly {
                    format!("{bucket}:00")
                } else {
                    bucket
                },
                earnings: bucket_earnings.round() as i64,
                rides: completed,
                cancellations: cancelled,
                avg_per_ride: avg,
            }
        })
        .collect();

    let summary = EarningsSummary {
        total_earnings: round2(total_earnings),
        total_rides: total_completed,
        avg_earning_per_ride: if total_completed > 0 {
            round2(total_earnings / total_completed as f64)
        } else {
            0.0
        },
        cancellation_rate: if total_all > 0 {
            round1(total_cancelled as f64 / total_all as f64 * 100.0)
        } else {
            0.0
        },
    };

    Ok(EarningsReport {
        has_data: !chart_data.is_empty(),
        chart_data,
        summary,
        date_range: DateRange { start, end },
        filters: filters.wire(),
        timestamp: now,
    })
}

/// Per-driver performance table and earnings-share pie chart.
pub async fn driver_performance(
    pool: &PgPool,
    filters: &ReportFilters,
) -> AppResult<DriverPerformanceReport> {
    let now = Utc::now();
    let (start, end) = filters.window(now);

    let rows = sqlx::query_as::<_, (Uuid, String, i64, i64, i64, f64)>(
        "SELECT r.driver_id, \
                COALESCE(d.name, 'Unknown Driver') AS driver_name, \
                COUNT(*) AS total_rides, \
                COUNT(*) FILTER (WHERE r.status = 'completed') AS completed, \
                COUNT(*) FILTER (WHERE r.status = 'cancelled') AS cancelled, \
                COALESCE(SUM(r.amount) FILTER (WHERE r.status = 'completed'), 0)::float8 \
                    AS earnings \
         FROM rides r \
         LEFT JOIN drivers d ON d.id = r.driver_id \
         WHERE r.ride_time >= $1 AND r.ride_time <= $2 AND r.driver_id IS NOT NULL \
         GROUP BY r.driver_id, d.name \
         ORDER BY earnings DESC",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to aggregate driver stats", e)
    })?;

    let pie_chart_data = rows
        .iter()
        .map(|(id, name, total, _, _, earnings)| DriverSlice {
            id: id.to_string(),
            name: name.clone(),
            earnings: round2(*earnings),
            rides: *total,
        })
        .collect();

    let table_data: Vec<DriverPerformanceRow> = rows
        .into_iter()
        .map(|(id, name, total, completed, cancelled, earnings)| {
            let rate = |part: i64| {
                if total > 0 {
                    round1(part as f64 / total as f64 * 100.0)
                } else {
                    0.0
                }
            };
            DriverPerformanceRow {
                id: id.to_string(),
                name,
                rides: total,
                completed_rides: completed,
                cancelled_rides: cancelled,
                earnings: round2(earnings),
                avg_per_ride: if completed > 0 {
                    round2(earnings / completed as f64)
                } else {
                    0.0
                },
                completion_rate: rate(completed),
                cancellation_rate: rate(cancelled),
            }
        })
        .collect();

    Ok(DriverPerformanceReport {
        pie_chart_data,
        has_data: !table_data.is_empty(),
        table_data,
        date_range: DateRange { start, end },
        timestamp: now,
    })
}

/// Ride volume/status series and service class distribution.
pub async fn rides_analysis(
    pool: &PgPool,
    filters: &ReportFilters,
) -> AppResult<RidesAnalysisReport> {
    let now = Utc::now();
    let (start, end) = filters.window(now);
    let hourly = filters.hourly_buckets();
    let bucket_format = if hourly { "HH24" } else { "YYYY-MM-DD" };

    let rows = sqlx::query_as::<_, (String, i64, i64, i64, i64, i64)>(
        "SELECT to_char(ride_time, $3::text) AS bucket, \
                COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled, \
                COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
                COUNT(*) FILTER (WHERE status = 'in-progress') AS in_progress \
         FROM rides \
         WHERE ride_time >= $1 AND ride_time <= $2 \
         GROUP BY bucket \
         ORDER BY bucket",
    )
    .bind(start)
    .bind(end)
    .bind(bucket_format)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to aggregate ride analysis", e)
    })?;

    let chart_data: Vec<RidesAnalysisPoint> = rows
        .into_iter()
        .map(
            |(bucket, total, completed, cancelled, pending, in_progress)| RidesAnalysisPoint {
                name: if hourly {
                    format!("{bucket}:00")
                } else {
                    bucket
                },
                rides: total,
                completed,
                cancelled,
                pending,
                in_progress,
            },
        )
        .collect();

    let services = sqlx::query_as::<_, (String, i64, f64)>(
        "SELECT service, \
                COUNT(*) AS count, \
                COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0)::float8 \
                    AS earnings \
         FROM rides \
         WHERE ride_time >= $1 AND ride_time <= $2 \
         GROUP BY service \
         ORDER BY service",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to aggregate service mix", e)
    })?;

    let mut service_distribution = ServiceDistribution {
        labels: Vec::new(),
        data: Vec::new(),
        earnings: Vec::new(),
    };
    for (service, count, earnings) in services {
        service_distribution.labels.push(service);
        service_distribution.data.push(count);
        service_distribution.earnings.push(round2(earnings));
    }

    Ok(RidesAnalysisReport {
        has_data: !chart_data.is_empty(),
        chart_data,
        service_distribution,
        date_range: DateRange { start, end },
        timestamp: now,
    })
}

/// Headline summary comparing the current period against the previous one.
pub async fn summary(
    pool: &PgPool,
    filters: &ReportFilters,
    policy: &ChangePolicy,
) -> AppResult<ReportsSummary> {
    let now = Utc::now();
    let ((cur_start, cur_end), (prev_start, prev_end)) = filters.comparison_windows(now);

    let current = period_totals(pool, cur_start, cur_end).await?;
    let previous = period_totals(pool, prev_start, prev_end).await?;

    Ok(ReportsSummary {
        total_earnings: round2(current.total_earnings),
        earnings_change: policy.percent_change(current.total_earnings, previous.total_earnings),
        total_rides: current.total_rides,
        rides_change: policy
            .percent_change(current.total_rides as f64, previous.total_rides as f64),
        avg_per_ride: current.avg_per_ride(),
        avg_per_ride_change: policy.percent_change(current.avg_per_ride(), previous.avg_per_ride()),
        cancellation_rate: current.cancellation_rate(),
        cancellation_rate_change: policy
            .percent_change(current.cancellation_rate(), previous.cancellation_rate()),
        time_range: filters.time_range.as_str().to_string(),
        timestamp: now,
    })
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
