//! Top-level real-time engine that ties together all subsystems.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use fleetpulse_core::config::AppConfig;
use fleetpulse_core::traits::{ChangeSource, SnapshotSource};

use crate::broadcast::{BroadcastEngine, Trigger};
use crate::cache::PayloadCache;
use crate::connection::ClientRegistry;
use crate::lifecycle::ConnectionLifecycle;
use crate::reports::ReportEngine;
use crate::rooms::RoomRegistry;
use crate::watcher::ChangeWatcher;

/// Central real-time engine owning the registries, cache, and engines.
///
/// Constructed once at process start and handed to the transport layer by
/// reference; all cross-cutting state lives here, never in globals.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Client registry.
    pub clients: Arc<ClientRegistry>,
    /// Room registry.
    pub rooms: Arc<RoomRegistry>,
    /// Last-good payload cache.
    pub cache: Arc<PayloadCache>,
    /// Collection broadcast engine.
    pub broadcast: Arc<BroadcastEngine>,
    /// Personalized report engine.
    pub reports: Arc<ReportEngine>,
    /// Connection lifecycle manager.
    pub lifecycle: Arc<ConnectionLifecycle>,
    watcher: Arc<ChangeWatcher>,
    trigger_rx: Arc<Mutex<Option<mpsc::Receiver<Trigger>>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates the engine with all subsystems wired together.
    pub fn new(
        config: &AppConfig,
        snapshots: Arc<dyn SnapshotSource>,
        changes: Arc<dyn ChangeSource>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        let clients = Arc::new(ClientRegistry::new(config.realtime.channel_buffer_size));
        let rooms = Arc::new(RoomRegistry::new());
        let cache = Arc::new(PayloadCache::new());

        let (broadcast, trigger_rx) = BroadcastEngine::new(
            Arc::clone(&snapshots),
            Arc::clone(&clients),
            Arc::clone(&rooms),
            Arc::clone(&cache),
            config.broadcast.clone(),
        );
        let broadcast = Arc::new(broadcast);

        let reports = Arc::new(ReportEngine::new(
            Arc::clone(&snapshots),
            Arc::clone(&clients),
            Arc::clone(&cache),
            config.reports.clone(),
        ));

        let lifecycle = Arc::new(ConnectionLifecycle::new(
            Arc::clone(&clients),
            Arc::clone(&rooms),
            Arc::clone(&cache),
            Arc::clone(&broadcast),
            Arc::clone(&reports),
            config.realtime.clone(),
        ));

        let watcher = Arc::new(ChangeWatcher::new(
            changes,
            snapshots,
            config.broadcast.clone(),
        ));

        info!("Real-time engine initialized");

        Self {
            clients,
            rooms,
            cache,
            broadcast,
            reports,
            lifecycle,
            watcher,
            trigger_rx: Arc::new(Mutex::new(Some(trigger_rx))),
            shutdown_tx,
        }
    }

    /// Starts all background tasks: the broadcast loop, the per-collection
    /// watchers, the periodic refresh, the report timers, and the stale
    /// sweeper. Call once.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        let shutdown = self.shutdown_tx.subscribe();

        let rx = self
            .trigger_rx
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(rx) = rx {
            handles.push(tokio::spawn(
                Arc::clone(&self.broadcast).run(rx, shutdown.clone()),
            ));
        }

        handles.extend(
            self.watcher
                .spawn_all(self.broadcast.sender(), shutdown.clone()),
        );
        if let Some(handle) = self.broadcast.spawn_refresh_timer(shutdown.clone()) {
            handles.push(handle);
        }
        handles.extend(self.reports.spawn_timers(shutdown.clone()));
        handles.push(self.lifecycle.spawn_sweeper(shutdown));

        info!("Real-time engine started");
        handles
    }

    /// A shutdown receiver for coordinating external tasks.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Signals all background tasks to stop and closes every connection.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");
        let _ = self.shutdown_tx.send(true);
        for handle in self.clients.all() {
            handle.close();
            self.rooms.leave_all(handle.id);
            self.clients.remove(&handle.id);
        }
        info!("Real-time engine shut down");
    }

    /// Number of connected observers.
    pub fn connection_count(&self) -> usize {
        self.clients.count()
    }
}
