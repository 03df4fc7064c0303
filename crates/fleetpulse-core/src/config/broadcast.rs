//! Change-watch and broadcast configuration.

use serde::{Deserialize, Serialize};

/// Change watcher and broadcast engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Whether to use the database's change-notification feature. When
    /// disabled (or when subscribing fails), the watcher falls back to
    /// timestamp polling.
    #[serde(default = "default_true")]
    pub change_streams_enabled: bool,
    /// Fixed delay before re-establishing a dropped subscription, in
    /// milliseconds. Fixed rather than exponential: watches are expected to
    /// be available as soon as the database is reachable again.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Polling-fallback interval per resource, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Periodic full-refresh interval while clients are connected, in
    /// seconds. Zero disables the periodic refresh.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// Delay between receiving a change and re-querying, in milliseconds.
    /// Gives the write that triggered the notification time to commit any
    /// companion rows.
    #[serde(default = "default_change_debounce")]
    pub change_debounce_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            change_streams_enabled: default_true(),
            reconnect_delay_ms: default_reconnect_delay(),
            poll_interval_ms: default_poll_interval(),
            refresh_interval_seconds: default_refresh_interval(),
            change_debounce_ms: default_change_debounce(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_change_debounce() -> u64 {
    100
}
