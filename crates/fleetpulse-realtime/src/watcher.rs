//! Change watcher — one reconnecting subscription per watched collection.
//!
//! Subscriptions are best-effort real-time sync, not a correctness-critical
//! path: on any error or close the watch is torn down and re-established
//! after a fixed delay, forever. When the change source cannot push at all,
//! the watcher degrades to timestamp polling per collection.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

use fleetpulse_core::config::broadcast::BroadcastConfig;
use fleetpulse_core::resource::ResourceKind;
use fleetpulse_core::traits::{ChangeSource, SnapshotSource};

use crate::broadcast::Trigger;

/// Watches every collection and forwards normalized triggers to the
/// broadcast engine.
pub struct ChangeWatcher {
    changes: Arc<dyn ChangeSource>,
    snapshots: Arc<dyn SnapshotSource>,
    config: BroadcastConfig,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher").finish()
    }
}

impl ChangeWatcher {
    /// Creates a watcher.
    pub fn new(
        changes: Arc<dyn ChangeSource>,
        snapshots: Arc<dyn SnapshotSource>,
        config: BroadcastConfig,
    ) -> Self {
        Self {
            changes,
            snapshots,
            config,
        }
    }

    /// Spawns one watch task per collection.
    pub fn spawn_all(
        &self,
        tx: mpsc::Sender<Trigger>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let streaming = self.config.change_streams_enabled && self.changes.supports_streams();
        if !streaming {
            info!("Change streams unavailable, using polling fallback");
        }

        ResourceKind::ALL
            .iter()
            .map(|&kind| {
                let changes = Arc::clone(&self.changes);
                let snapshots = Arc::clone(&self.snapshots);
                let config = self.config.clone();
                let tx = tx.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if streaming {
                        watch_resource(changes, config, kind, tx, shutdown).await;
                    } else {
                        poll_resource(snapshots, config, kind, tx, shutdown).await;
                    }
                })
            })
            .collect()
    }
}

/// Subscription loop for one collection: subscribe, forward changes, and on
/// any failure resubscribe after the fixed reconnect delay.
async fn watch_resource(
    changes: Arc<dyn ChangeSource>,
    config: BroadcastConfig,
    kind: ResourceKind,
    tx: mpsc::Sender<Trigger>,
    mut shutdown: watch::Receiver<bool>,
) {
    let reconnect_delay = Duration::from_millis(config.reconnect_delay_ms);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match changes.subscribe(kind).await {
            Ok(mut stream) => {
                info!(resource = %kind, "Change subscription established");
                loop {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return;
                            }
                        }
                        result = stream.next_change() => match result {
                            Ok(event) => {
                                debug!(resource = %kind, op = %event.op, "Change observed");
                                if tx.send(Trigger::Change(event)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!(resource = %kind, error = %e, "Change subscription lost");
                                break;
                            }
                        },
                    }
                }
            }
            Err(e) => {
                warn!(resource = %kind, error = %e, "Failed to open change subscription");
            }
        }

        // fixed delay, no retry cap
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = time::sleep(reconnect_delay) => {
                info!(resource = %kind, "Reconnecting change subscription");
            }
        }
    }
}

/// Polling fallback for one collection: compare the latest modification
/// timestamp against the last seen value and synthesize a trigger when it
/// advances. The first observation only sets the baseline.
async fn poll_resource(
    snapshots: Arc<dyn SnapshotSource>,
    config: BroadcastConfig,
    kind: ResourceKind,
    tx: mpsc::Sender<Trigger>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = time::interval(Duration::from_millis(config.poll_interval_ms.max(1)));
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    let mut last_seen = None;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                match snapshots.latest_modified(kind).await {
                    Ok(Some(modified)) => match last_seen {
                        None => last_seen = Some(modified),
                        Some(seen) if modified > seen => {
                            debug!(resource = %kind, "Change detected via polling");
                            last_seen = Some(modified);
                            if tx.send(Trigger::Poll(kind)).await.is_err() {
                                break;
                            }
                        }
                        Some(_) => {}
                    },
                    Ok(None) => {}
                    Err(e) => {
                        warn!(resource = %kind, error = %e, "Polling query failed");
                    }
                }
            }
        }
    }
}
