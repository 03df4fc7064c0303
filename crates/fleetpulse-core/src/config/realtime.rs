//! Real-time connection and session configuration.

use serde::{Deserialize, Serialize};

/// WebSocket connection/session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound message buffer size per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// How often the stale-session sweeper runs, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Idle threshold for general connections, in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Idle threshold for connections that have requested reports, in
    /// seconds. Report clients get a longer leash because periodic report
    /// pushes are their only traffic.
    #[serde(default = "default_report_idle_timeout")]
    pub report_idle_timeout_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            sweep_interval_seconds: default_sweep_interval(),
            idle_timeout_seconds: default_idle_timeout(),
            report_idle_timeout_seconds: default_report_idle_timeout(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_report_idle_timeout() -> u64 {
    1800
}
