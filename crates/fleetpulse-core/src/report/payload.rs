//! Report payload shapes, validation predicates, and placeholders.
//!
//! Every report kind has an explicit builder struct (used by the store to
//! assemble results) and a structural validation predicate over the wire
//! JSON. The predicate is what the broadcast path checks before a payload
//! may overwrite the cache or reach a client; a payload that fails it is
//! replaced by the cached last-good copy or, failing that, by the zeroed
//! placeholder from [`ReportKind::placeholder`] so clients never render a
//! missing structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resource::ReportKind;

/// The resolved query window echoed in report payloads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Window start.
    pub start: DateTime<Utc>,
    /// Window end.
    pub end: DateTime<Utc>,
}

/// One bucket of the earnings time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsPoint {
    /// Bucket label: `"HH:00"` for hourly series, `YYYY-MM-DD` otherwise.
    pub name: String,
    /// Earnings in the bucket, rounded to whole units.
    pub earnings: i64,
    /// Completed rides in the bucket.
    pub rides: i64,
    /// Cancelled rides in the bucket.
    pub cancellations: i64,
    /// Average earning per completed ride.
    pub avg_per_ride: f64,
}

/// Whole-window earnings totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    /// Total earnings from completed rides.
    pub total_earnings: f64,
    /// Completed ride count.
    pub total_rides: i64,
    /// Average earning per completed ride.
    pub avg_earning_per_ride: f64,
    /// Cancelled share of all rides, percent.
    pub cancellation_rate: f64,
}

/// Earnings report: chart series plus summary totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsReport {
    /// Time series buckets.
    pub chart_data: Vec<EarningsPoint>,
    /// Whole-window totals.
    pub summary: EarningsSummary,
    /// Resolved query window.
    pub date_range: DateRange,
    /// Echo of the filters that produced this payload.
    pub filters: Value,
    /// Whether the window contained any data.
    pub has_data: bool,
    /// When the payload was computed.
    pub timestamp: DateTime<Utc>,
}

/// One driver's slice of the performance pie chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSlice {
    /// Driver ID.
    pub id: String,
    /// Driver display name.
    pub name: String,
    /// Earnings attributed to the driver.
    pub earnings: f64,
    /// Total rides.
    pub rides: i64,
}

/// One row of the driver performance table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPerformanceRow {
    /// Driver ID.
    pub id: String,
    /// Driver display name.
    pub name: String,
    /// Total rides.
    pub rides: i64,
    /// Completed rides.
    pub completed_rides: i64,
    /// Cancelled rides.
    pub cancelled_rides: i64,
    /// Earnings from completed rides.
    pub earnings: f64,
    /// Average earning per completed ride.
    pub avg_per_ride: f64,
    /// Completed share of all rides, percent.
    pub completion_rate: f64,
    /// Cancelled share of all rides, percent.
    pub cancellation_rate: f64,
}

/// Driver performance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPerformanceReport {
    /// Earnings-share pie chart slices.
    pub pie_chart_data: Vec<DriverSlice>,
    /// Per-driver table rows, sorted by earnings descending.
    pub table_data: Vec<DriverPerformanceRow>,
    /// Resolved query window.
    pub date_range: DateRange,
    /// Whether the window contained any data.
    pub has_data: bool,
    /// When the payload was computed.
    pub timestamp: DateTime<Utc>,
}

/// One bucket of the rides analysis series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RidesAnalysisPoint {
    /// Bucket label.
    pub name: String,
    /// Total rides in the bucket.
    pub rides: i64,
    /// Completed rides.
    pub completed: i64,
    /// Cancelled rides.
    pub cancelled: i64,
    /// Pending rides.
    pub pending: i64,
    /// In-progress rides.
    pub in_progress: i64,
}

/// Ride counts and earnings grouped by service class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDistribution {
    /// Service class names.
    pub labels: Vec<String>,
    /// Ride count per service class.
    pub data: Vec<i64>,
    /// Earnings per service class.
    pub earnings: Vec<f64>,
}

/// Rides analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RidesAnalysisReport {
    /// Status breakdown time series.
    pub chart_data: Vec<RidesAnalysisPoint>,
    /// Service class distribution.
    pub service_distribution: ServiceDistribution,
    /// Resolved query window.
    pub date_range: DateRange,
    /// Whether the window contained any data.
    pub has_data: bool,
    /// When the payload was computed.
    pub timestamp: DateTime<Utc>,
}

/// Headline summary with period-over-period deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsSummary {
    /// Current-period earnings.
    pub total_earnings: f64,
    /// Delta vs. the previous period, percent.
    pub earnings_change: f64,
    /// Current-period ride count.
    pub total_rides: i64,
    /// Delta vs. the previous period, percent.
    pub rides_change: f64,
    /// Average earning per ride.
    pub avg_per_ride: f64,
    /// Delta vs. the previous period, percent.
    pub avg_per_ride_change: f64,
    /// Cancelled share of all rides, percent.
    pub cancellation_rate: f64,
    /// Delta vs. the previous period, percentage points.
    pub cancellation_rate_change: f64,
    /// Granularity the summary was computed for.
    pub time_range: String,
    /// When the payload was computed.
    pub timestamp: DateTime<Utc>,
}

/// Dashboard headline stats pushed to the default room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Rides today.
    pub today_rides: i64,
    /// Delta vs. yesterday, percent.
    pub rides_change: f64,
    /// Income today.
    pub today_income: f64,
    /// Delta vs. yesterday, percent.
    pub income_change: f64,
    /// Completed rides today.
    pub completed_today: i64,
    /// Cancelled rides today.
    pub cancelled_today: i64,
    /// Drivers currently online.
    pub total_drivers: i64,
    /// Drivers who joined in the last 7 days.
    pub new_drivers_this_week: i64,
    /// New-driver delta vs. the previous week, percent.
    pub driver_growth: f64,
    /// When the stats were computed.
    pub timestamp: DateTime<Utc>,
}

impl ReportKind {
    /// Structural validation predicate over the wire JSON.
    ///
    /// Mirrors what dashboards actually dereference: a payload passing this
    /// check can be rendered without undefined-field crashes. Total over
    /// both kind and input shape.
    pub fn validate(&self, data: &Value) -> bool {
        let Some(obj) = data.as_object() else {
            return false;
        };
        match self {
            ReportKind::Earnings => {
                obj.get("chartData").is_some_and(Value::is_array)
                    && obj.get("summary").is_some_and(Value::is_object)
            }
            ReportKind::DriverPerformance => obj.get("tableData").is_some_and(Value::is_array),
            ReportKind::RidesAnalysis => obj.get("chartData").is_some_and(Value::is_array),
            ReportKind::ReportsSummary => {
                obj.get("totalEarnings").is_some_and(Value::is_number)
                    && obj.get("totalRides").is_some_and(Value::is_number)
            }
        }
    }

    /// Zeroed default payload emitted when no data has ever been computed.
    /// Always passes [`validate`](Self::validate).
    pub fn placeholder(&self) -> Value {
        match self {
            ReportKind::Earnings => serde_json::json!({
                "chartData": [],
                "summary": {
                    "totalEarnings": 0,
                    "totalRides": 0,
                    "avgEarningPerRide": 0,
                    "cancellationRate": 0,
                },
                "hasData": false,
            }),
            ReportKind::DriverPerformance => serde_json::json!({
                "pieChartData": [],
                "tableData": [],
                "hasData": false,
            }),
            ReportKind::RidesAnalysis => serde_json::json!({
                "chartData": [],
                "serviceDistribution": { "labels": [], "data": [], "earnings": [] },
                "hasData": false,
            }),
            ReportKind::ReportsSummary => serde_json::json!({
                "totalEarnings": 0,
                "earningsChange": 0,
                "totalRides": 0,
                "ridesChange": 0,
                "avgPerRide": 0,
                "avgPerRideChange": 0,
                "cancellationRate": 0,
                "cancellationRateChange": 0,
                "hasData": false,
            }),
        }
    }
}

/// Validation predicate for dashboard stats: at least one headline counter
/// must be present and non-negative.
pub fn validate_dashboard(data: &Value) -> bool {
    let Some(obj) = data.as_object() else {
        return false;
    };
    ["todayRides", "totalDrivers", "todayIncome"]
        .iter()
        .any(|key| obj.get(*key).and_then(Value::as_f64).is_some_and(|v| v >= 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_pass_validation() {
        for kind in ReportKind::ALL {
            assert!(
                kind.validate(&kind.placeholder()),
                "{kind} placeholder failed its own predicate"
            );
        }
    }

    #[test]
    fn test_earnings_missing_chart_is_invalid() {
        let data = serde_json::json!({ "summary": {}, "hasData": true });
        assert!(!ReportKind::Earnings.validate(&data));
    }

    #[test]
    fn test_earnings_chart_must_be_array() {
        let data = serde_json::json!({ "chartData": "oops", "summary": {} });
        assert!(!ReportKind::Earnings.validate(&data));
    }

    #[test]
    fn test_summary_requires_totals() {
        let data = serde_json::json!({ "totalEarnings": 120.5 });
        assert!(!ReportKind::ReportsSummary.validate(&data));
        let data = serde_json::json!({ "totalEarnings": 120.5, "totalRides": 8 });
        assert!(ReportKind::ReportsSummary.validate(&data));
    }

    #[test]
    fn test_non_object_is_invalid() {
        for kind in ReportKind::ALL {
            assert!(!kind.validate(&Value::Null));
            assert!(!kind.validate(&serde_json::json!([1, 2, 3])));
        }
    }

    #[test]
    fn test_dashboard_validation() {
        assert!(validate_dashboard(
            &serde_json::json!({ "todayRides": 12, "totalDrivers": 4 })
        ));
        assert!(!validate_dashboard(&serde_json::json!({ "todayRides": -1 })));
        assert!(!validate_dashboard(&serde_json::json!({})));
        assert!(!validate_dashboard(&Value::Null));
    }

    #[test]
    fn test_typed_builder_matches_predicate() {
        let report = EarningsReport {
            chart_data: vec![],
            summary: EarningsSummary {
                total_earnings: 0.0,
                total_rides: 0,
                avg_earning_per_ride: 0.0,
                cancellation_rate: 0.0,
            },
            date_range: DateRange {
                start: Utc::now(),
                end: Utc::now(),
            },
            filters: serde_json::json!({}),
            has_data: false,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(ReportKind::Earnings.validate(&value));
    }
}
