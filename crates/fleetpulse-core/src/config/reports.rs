//! Report engine configuration.

use serde::{Deserialize, Serialize};

/// Personalized report engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Interval between personalized summary re-broadcasts, in seconds.
    #[serde(default = "default_summary_interval")]
    pub summary_interval_seconds: u64,
    /// Interval between personalized earnings re-broadcasts, in seconds.
    /// Longer than the summary interval because the earnings aggregation
    /// is the heaviest query in the system.
    #[serde(default = "default_earnings_interval")]
    pub earnings_interval_seconds: u64,
    /// Maximum explicit date range accepted from clients, in days.
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
    /// Cap applied to period-over-period percentage deltas (±).
    #[serde(default = "default_change_cap")]
    pub change_cap_percent: f64,
    /// Cap applied when the previous period was zero-valued.
    #[serde(default = "default_zero_baseline_cap")]
    pub zero_baseline_cap_percent: f64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            summary_interval_seconds: default_summary_interval(),
            earnings_interval_seconds: default_earnings_interval(),
            max_range_days: default_max_range_days(),
            change_cap_percent: default_change_cap(),
            zero_baseline_cap_percent: default_zero_baseline_cap(),
        }
    }
}

fn default_summary_interval() -> u64 {
    300
}

fn default_earnings_interval() -> u64 {
    600
}

fn default_max_range_days() -> i64 {
    365
}

fn default_change_cap() -> f64 {
    200.0
}

fn default_zero_baseline_cap() -> f64 {
    50.0
}
