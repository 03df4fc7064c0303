//! Period-over-period delta calculation.

use serde::{Deserialize, Serialize};

use crate::config::reports::ReportsConfig;

/// Policy for smoothing percentage deltas shown on dashboards.
///
/// Extreme swings (a quiet period followed by a normal one) produce
/// deltas in the thousands of percent that read as noise on a stat tile,
/// so deltas are capped and the zero-baseline case is mapped to a small
/// positive figure instead of infinity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChangePolicy {
    /// Cap for normal deltas (±).
    pub cap_percent: f64,
    /// Cap when the previous period was zero-valued.
    pub zero_baseline_cap_percent: f64,
}

impl ChangePolicy {
    /// Builds the policy from configuration.
    pub fn from_config(config: &ReportsConfig) -> Self {
        Self {
            cap_percent: config.change_cap_percent,
            zero_baseline_cap_percent: config.zero_baseline_cap_percent,
        }
    }

    /// Percentage change from `previous` to `current`, rounded to one
    /// decimal and clamped to the policy caps.
    pub fn percent_change(&self, current: f64, previous: f64) -> f64 {
        if current == 0.0 && previous == 0.0 {
            return 0.0;
        }
        if previous == 0.0 && current > 0.0 {
            return self.zero_baseline_cap_percent.min((current * 0.1).round());
        }
        if current == 0.0 && previous > 0.0 {
            return -100.0;
        }
        let change = (current - previous) / previous * 100.0;
        let rounded = (change * 10.0).round() / 10.0;
        rounded.clamp(-self.cap_percent, self.cap_percent)
    }
}

impl Default for ChangePolicy {
    fn default() -> Self {
        Self::from_config(&ReportsConfig::default())
    }
}
