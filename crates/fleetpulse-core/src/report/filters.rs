//! Client-supplied report filter parsing and period resolution.
//!
//! Filters arrive as loose JSON/query-string parameters and are validated
//! into [`ReportFilters`] before any query runs. A malformed filter set is
//! rejected to the requesting client only and never reaches the engines.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::resource::ReportKind;
use crate::result::AppResult;

/// Reporting granularity / relative window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// Today, bucketed by hour.
    Day,
    /// Last 7 days, bucketed by day.
    Week,
    /// Last month, bucketed by day.
    Month,
}

impl TimeRange {
    /// Lowercase name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
        }
    }

    /// Parses a time range name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(TimeRange::Day),
            "week" => Some(TimeRange::Week),
            "month" => Some(TimeRange::Month),
            _ => None,
        }
    }
}

/// Optional per-driver scoping of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverFilter {
    /// No driver scoping.
    All,
    /// Restrict to one driver.
    Id(Uuid),
}

impl DriverFilter {
    /// Wire representation: `"all"` or the driver UUID.
    pub fn wire(&self) -> String {
        match self {
            DriverFilter::All => "all".to_string(),
            DriverFilter::Id(id) => id.to_string(),
        }
    }
}

/// Unvalidated report parameters as submitted by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawReportParams {
    /// Window start (`YYYY-MM-DD` or RFC 3339).
    pub start_date: Option<String>,
    /// Window end (`YYYY-MM-DD` or RFC 3339).
    pub end_date: Option<String>,
    /// Granularity: `day`, `week`, or `month`.
    pub time_range: Option<String>,
    /// `"all"` or a driver UUID.
    pub driver_filter: Option<String>,
}

/// Validated report filters scoping a personalized computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportFilters {
    /// Explicit window start; overrides the relative window when paired
    /// with `end_date`.
    pub start_date: Option<DateTime<Utc>>,
    /// Explicit window end.
    pub end_date: Option<DateTime<Utc>>,
    /// Granularity / relative window.
    pub time_range: TimeRange,
    /// Driver scoping.
    pub driver: DriverFilter,
}

impl ReportFilters {
    /// Default filters for a report kind: `week` granularity, except the
    /// summary which compares today against yesterday.
    pub fn defaults(kind: ReportKind) -> Self {
        let time_range = match kind {
            ReportKind::ReportsSummary => TimeRange::Day,
            _ => TimeRange::Week,
        };
        Self {
            start_date: None,
            end_date: None,
            time_range,
            driver: DriverFilter::All,
        }
    }

    /// Validates raw client parameters into filters.
    ///
    /// An explicit date range is honored only when both ends are present.
    /// Rules: dates must parse, start must not follow end, the range must
    /// not exceed `max_range_days`, the time range must be a known
    /// granularity, and the driver filter must be `all` or a UUID.
    pub fn parse(
        raw: &RawReportParams,
        kind: ReportKind,
        max_range_days: i64,
    ) -> AppResult<Self> {
        let mut filters = Self::defaults(kind);

        if let Some(tr) = raw.time_range.as_deref() {
            filters.time_range = TimeRange::parse(tr).ok_or_else(|| {
                AppError::validation("Invalid time range. Must be one of: day, week, month.")
            })?;
        }

        if let (Some(start_raw), Some(end_raw)) =
            (raw.start_date.as_deref(), raw.end_date.as_deref())
        {
            let start = parse_date(start_raw, false).ok_or_else(|| {
                AppError::validation("Invalid date format. Please use YYYY-MM-DD format.")
            })?;
            let end = parse_date(end_raw, true).ok_or_else(|| {
                AppError::validation("Invalid date format. Please use YYYY-MM-DD format.")
            })?;

            if start > end {
                return Err(AppError::validation("Start date cannot be after end date."));
            }
            if (end - start).num_days() > max_range_days {
                return Err(AppError::validation(format!(
                    "Date range cannot exceed {max_range_days} days."
                )));
            }

            filters.start_date = Some(start);
            filters.end_date = Some(end);
        }

        match raw.driver_filter.as_deref() {
            None | Some("all") => {}
            Some(id) => {
                let id = Uuid::parse_str(id)
                    .map_err(|_| AppError::validation("Invalid driver ID format."))?;
                filters.driver = DriverFilter::Id(id);
            }
        }

        Ok(filters)
    }

    /// Resolves the effective query window relative to `now`.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            return (start, end);
        }
        match self.time_range {
            TimeRange::Day => (start_of_day(now), end_of_day(now)),
            TimeRange::Week => (start_of_day(now - Duration::days(6)), now),
            TimeRange::Month => (start_of_day(now - Months::new(1)), now),
        }
    }

    /// Resolves the current window and the immediately preceding window of
    /// the same length, for period-over-period deltas.
    pub fn comparison_windows(
        &self,
        now: DateTime<Utc>,
    ) -> ((DateTime<Utc>, DateTime<Utc>), (DateTime<Utc>, DateTime<Utc>)) {
        match self.time_range {
            TimeRange::Day => {
                let current = (start_of_day(now), end_of_day(now));
                let yesterday = now - Duration::days(1);
                (current, (start_of_day(yesterday), end_of_day(yesterday)))
            }
            TimeRange::Week => {
                let cur_start = start_of_day(now - Duration::days(6));
                let prev_end = end_of_day(cur_start - Duration::days(1));
                let prev_start = start_of_day(prev_end - Duration::days(6));
                ((cur_start, now), (prev_start, prev_end))
            }
            TimeRange::Month => {
                let cur_start = start_of_day(now - Months::new(1));
                let prev_end = end_of_day(cur_start - Duration::days(1));
                let prev_start = start_of_day(prev_end - Months::new(1));
                ((cur_start, now), (prev_start, prev_end))
            }
        }
    }

    /// Whether the series should be bucketed by hour rather than by day.
    pub fn hourly_buckets(&self) -> bool {
        self.time_range == TimeRange::Day && self.start_date.is_none()
    }

    /// Filter echo included in report payloads so clients can confirm
    /// which parameters produced the data.
    pub fn wire(&self) -> serde_json::Value {
        serde_json::json!({
            "driverFilter": self.driver.wire(),
            "timeRange": self.time_range.as_str(),
        })
    }
}

/// Parses `YYYY-MM-DD` (expanded to start/end of day) or RFC 3339.
fn parse_date(s: &str, end_of_range: bool) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let dt = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
        return Some(if end_of_range { end_of_day(dt) } else { dt });
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Midnight at the start of `dt`'s day.
pub fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(dt.year(), dt.month(), dt.day(), 0, 0, 0)
        .single()
        .unwrap_or(dt)
}

/// Last representable instant of `dt`'s day.
pub fn end_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(dt) + Duration::days(1) - Duration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(
        start: Option<&str>,
        end: Option<&str>,
        tr: Option<&str>,
        driver: Option<&str>,
    ) -> RawReportParams {
        RawReportParams {
            start_date: start.map(String::from),
            end_date: end.map(String::from),
            time_range: tr.map(String::from),
            driver_filter: driver.map(String::from),
        }
    }

    #[test]
    fn test_defaults_per_kind() {
        assert_eq!(
            ReportFilters::defaults(ReportKind::Earnings).time_range,
            TimeRange::Week
        );
        assert_eq!(
            ReportFilters::defaults(ReportKind::ReportsSummary).time_range,
            TimeRange::Day
        );
    }

    #[test]
    fn test_parse_valid_range() {
        let filters = ReportFilters::parse(
            &raw(Some("2026-01-01"), Some("2026-01-31"), Some("month"), None),
            ReportKind::Earnings,
            365,
        )
        .unwrap();
        assert_eq!(filters.time_range, TimeRange::Month);
        assert!(filters.start_date.unwrap() < filters.end_date.unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let err = ReportFilters::parse(
            &raw(Some("not-a-date"), Some("2026-01-31"), None, None),
            ReportKind::Earnings,
            365,
        )
        .unwrap_err();
        assert!(err.message.contains("Invalid date format"));
    }

    #[test]
    fn test_parse_rejects_inverted_range() {
        let err = ReportFilters::parse(
            &raw(Some("2026-02-01"), Some("2026-01-01"), None, None),
            ReportKind::Earnings,
            365,
        )
        .unwrap_err();
        assert!(err.message.contains("Start date cannot be after end date"));
    }

    #[test]
    fn test_parse_rejects_oversized_range() {
        let err = ReportFilters::parse(
            &raw(Some("2020-01-01"), Some("2026-01-01"), None, None),
            ReportKind::Earnings,
            365,
        )
        .unwrap_err();
        assert!(err.message.contains("cannot exceed 365 days"));
    }

    #[test]
    fn test_parse_rejects_bad_time_range() {
        let err = ReportFilters::parse(
            &raw(None, None, Some("year"), None),
            ReportKind::Earnings,
            365,
        )
        .unwrap_err();
        assert!(err.message.contains("Invalid time range"));
    }

    #[test]
    fn test_parse_rejects_bad_driver_id() {
        let err = ReportFilters::parse(
            &raw(None, None, None, Some("driver-42")),
            ReportKind::Earnings,
            365,
        )
        .unwrap_err();
        assert!(err.message.contains("Invalid driver ID"));
    }

    #[test]
    fn test_single_date_is_ignored() {
        let filters = ReportFilters::parse(
            &raw(Some("2026-01-01"), None, None, None),
            ReportKind::Earnings,
            365,
        )
        .unwrap();
        assert!(filters.start_date.is_none());
    }

    #[test]
    fn test_day_window_covers_whole_day() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 14, 30, 0).unwrap();
        let filters = ReportFilters::defaults(ReportKind::ReportsSummary);
        let (start, end) = filters.window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 6, 0, 0, 0).unwrap());
        assert!(end > now);
    }

    #[test]
    fn test_comparison_windows_do_not_overlap() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        for tr in [TimeRange::Day, TimeRange::Week, TimeRange::Month] {
            let filters = ReportFilters {
                start_date: None,
                end_date: None,
                time_range: tr,
                driver: DriverFilter::All,
            };
            let ((cur_start, _), (prev_start, prev_end)) = filters.comparison_windows(now);
            assert!(prev_end < cur_start, "{tr:?} windows overlap");
            assert!(prev_start < prev_end);
        }
    }
}
