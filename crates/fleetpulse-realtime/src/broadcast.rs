//! Broadcast engine — turns triggers into validated pushes.
//!
//! All triggers flow through one channel and are processed by a single
//! consumer loop, so change events are broadcast in arrival order and two
//! cycles never overlap. Periodic ticks are the exception: a tick due
//! while a cycle is in flight is skipped outright rather than queued.
//! Clients converge on the next cycle anyway, and piling up aggregation
//! queries is worse than a few seconds of staleness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

use fleetpulse_core::config::broadcast::BroadcastConfig;
use fleetpulse_core::events::ChangeEvent;
use fleetpulse_core::report::payload::validate_dashboard;
use fleetpulse_core::resource::{ResourceKind, Room};
use fleetpulse_core::traits::SnapshotSource;

use crate::cache::{CacheKey, PayloadCache};
use crate::connection::{ClientId, ClientRegistry};
use crate::message::{outbound, Envelope};
use crate::rooms::RoomRegistry;

/// Event name for dashboard stat pushes.
const DASHBOARD_EVENT: &str = "dashboardStats";

/// One unit of broadcast work.
#[derive(Debug)]
pub enum Trigger {
    /// A change event from the watcher: advisory notice, then re-broadcast.
    Change(ChangeEvent),
    /// A polling-fallback detection: re-broadcast only.
    Poll(ResourceKind),
    /// A client-requested refresh. The requester, when present, receives a
    /// `refresh-complete` acknowledgment.
    Refresh {
        /// Collections to re-broadcast.
        kinds: Vec<ResourceKind>,
        /// Connection to acknowledge.
        requester: Option<ClientId>,
    },
    /// Periodic full refresh.
    Tick,
}

/// Compute-validate-push engine for collection snapshots and dashboard
/// stats.
pub struct BroadcastEngine {
    snapshots: Arc<dyn SnapshotSource>,
    clients: Arc<ClientRegistry>,
    rooms: Arc<RoomRegistry>,
    cache: Arc<PayloadCache>,
    config: BroadcastConfig,
    in_flight: AtomicBool,
    tx: mpsc::Sender<Trigger>,
}

impl std::fmt::Debug for BroadcastEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastEngine").finish()
    }
}

impl BroadcastEngine {
    /// Creates the engine and the receiver its run loop consumes.
    pub fn new(
        snapshots: Arc<dyn SnapshotSource>,
        clients: Arc<ClientRegistry>,
        rooms: Arc<RoomRegistry>,
        cache: Arc<PayloadCache>,
        config: BroadcastConfig,
    ) -> (Self, mpsc::Receiver<Trigger>) {
        let (tx, rx) = mpsc::channel(256);
        (
            Self {
                snapshots,
                clients,
                rooms,
                cache,
                config,
                in_flight: AtomicBool::new(false),
                tx,
            },
            rx,
        )
    }

    /// A sender for submitting triggers (used by the watcher).
    pub fn sender(&self) -> mpsc::Sender<Trigger> {
        self.tx.clone()
    }

    /// Submits a trigger for processing in arrival order.
    pub async fn trigger(&self, trigger: Trigger) {
        if self.tx.send(trigger).await.is_err() {
            warn!("Broadcast engine stopped, dropping trigger");
        }
    }

    /// Whether a broadcast cycle is currently executing.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submits a periodic tick unless a cycle is already in flight.
    pub async fn tick(&self) {
        if self.is_busy() {
            debug!("Broadcast cycle in flight, skipping tick");
            return;
        }
        self.trigger(Trigger::Tick).await;
    }

    /// Consumes triggers until shutdown. One trigger is processed at a
    /// time; a failure in one collection's cycle never halts the loop.
    pub async fn run(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<Trigger>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Broadcast engine started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                trigger = rx.recv() => match trigger {
                    Some(trigger) => self.handle_trigger(trigger).await,
                    None => break,
                },
            }
        }
        info!("Broadcast engine stopped");
    }

    async fn handle_trigger(&self, trigger: Trigger) {
        let _guard = InFlightGuard::hold(&self.in_flight);

        match trigger {
            Trigger::Change(event) => {
                debug!(
                    resource = %event.resource,
                    op = %event.op,
                    "Processing change event"
                );
                self.send_to_room(
                    Room::Resource(event.resource),
                    &outbound::change_notice(&event),
                )
                .await;

                if self.config.change_debounce_ms > 0 {
                    time::sleep(Duration::from_millis(self.config.change_debounce_ms)).await;
                }

                self.broadcast_resource(event.resource).await;
                if event.resource.affects_dashboard() {
                    self.broadcast_dashboard().await;
                }
            }
            Trigger::Poll(kind) => {
                debug!(resource = %kind, "Processing polled change");
                self.broadcast_resource(kind).await;
                if kind.affects_dashboard() {
                    self.broadcast_dashboard().await;
                }
            }
            Trigger::Refresh { kinds, requester } => {
                for kind in &kinds {
                    self.broadcast_resource(*kind).await;
                }
                self.broadcast_dashboard().await;
                if let Some(id) = requester {
                    if let Some(handle) = self.clients.get(&id) {
                        let _ = handle.send(&outbound::refresh_complete()).await;
                    }
                }
            }
            Trigger::Tick => {
                if self.clients.is_empty() {
                    return;
                }
                debug!("Periodic refresh for all collections");
                for kind in ResourceKind::ALL {
                    self.broadcast_resource(kind).await;
                }
                self.broadcast_dashboard().await;
            }
        }
    }

    /// One broadcast cycle for a collection: fetch, cache on success, push
    /// to the room; fall back to the cached payload on failure, or stay
    /// silent when no payload has ever been validated.
    async fn broadcast_resource(&self, kind: ResourceKind) {
        match self.snapshots.fetch(kind).await {
            Ok(docs) => {
                let payload =
                    outbound::success_payload(serde_json::Value::Array(docs), None);
                self.cache.store(CacheKey::Resource(kind), payload.clone());
                self.send_to_room(
                    Room::Resource(kind),
                    &Envelope::new(kind.update_event(), payload),
                )
                .await;
            }
            Err(e) => {
                warn!(resource = %kind, error = %e, "Snapshot query failed");
                match self.cache.get(CacheKey::Resource(kind)) {
                    Some(cached) => {
                        self.send_to_room(
                            Room::Resource(kind),
                            &Envelope::new(kind.update_event(), cached.payload),
                        )
                        .await;
                    }
                    None => {
                        debug!(resource = %kind, "No cached payload, suppressing broadcast");
                    }
                }
            }
        }
    }

    /// One broadcast cycle for the dashboard stats.
    async fn broadcast_dashboard(&self) {
        match self.snapshots.fetch_dashboard().await {
            Ok(stats) if validate_dashboard(&stats) => {
                self.cache.store(CacheKey::Dashboard, stats.clone());
                self.send_to_room(Room::Dashboard, &Envelope::new(DASHBOARD_EVENT, stats))
                    .await;
            }
            Ok(_) => {
                warn!("Dashboard stats failed validation");
                self.send_cached_dashboard().await;
            }
            Err(e) => {
                warn!(error = %e, "Dashboard stats query failed");
                self.send_cached_dashboard().await;
            }
        }
    }

    async fn send_cached_dashboard(&self) {
        if let Some(cached) = self.cache.get(CacheKey::Dashboard) {
            self.send_to_room(Room::Dashboard, &Envelope::new(DASHBOARD_EVENT, cached.payload))
                .await;
        }
    }

    /// Sends one envelope to every member of a room, serializing once.
    async fn send_to_room(&self, room: Room, envelope: &Envelope) {
        let members = self.rooms.members(room);
        if members.is_empty() {
            return;
        }
        let text = envelope.to_text();
        let mut sent = 0usize;
        for id in &members {
            if let Some(handle) = self.clients.get(id) {
                if handle.send_text(text.clone()).await {
                    sent += 1;
                }
            }
        }
        debug!(room = %room, event = %envelope.event, sent, "Broadcast delivered");
    }

    /// Spawns the periodic refresh timer. Ticks due while a cycle is in
    /// flight are skipped.
    pub fn spawn_refresh_timer(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        if self.config.refresh_interval_seconds == 0 {
            return None;
        }
        let engine = Arc::clone(self);
        let period = Duration::from_secs(self.config.refresh_interval_seconds);
        Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            // the first tick fires immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => engine.tick().await,
                }
            }
        }))
    }
}

/// RAII in-flight flag for one broadcast cycle.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn hold(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{recv_envelope, try_recv_envelope, FakeSnapshots, TestHarness};
    use fleetpulse_core::resource::ChangeOp;

    #[tokio::test]
    async fn test_change_fans_out_identical_payload() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        harness.snapshots.set_docs(
            ResourceKind::Vehicles,
            vec![serde_json::json!({ "id": "v1", "status": "Active" })],
        );

        let mut observers = Vec::new();
        for _ in 0..3 {
            let (handle, rx) = harness.clients.register();
            harness
                .rooms
                .join(Room::Resource(ResourceKind::Vehicles), handle.id);
            observers.push((handle, rx));
        }

        harness
            .engine
            .trigger(Trigger::Change(ChangeEvent::new(
                ResourceKind::Vehicles,
                ChangeOp::Update,
                "v1",
                None,
            )))
            .await;

        let mut update_frames = Vec::new();
        for (_, rx) in &mut observers {
            let notice = recv_envelope(rx).await;
            assert_eq!(notice.event, "vehicles:update");
            let update = recv_envelope(rx).await;
            assert_eq!(update.event, "vehiclesUpdate");
            assert_eq!(update.data["success"], true);
            update_frames.push(update);
        }

        // identical payload, identical timestamp, for every observer
        assert_eq!(update_frames[0], update_frames[1]);
        assert_eq!(update_frames[1], update_frames[2]);
    }

    #[tokio::test]
    async fn test_failed_cycle_leaves_cache_untouched_and_sends_fallback() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        harness.snapshots.set_docs(
            ResourceKind::Drivers,
            vec![serde_json::json!({ "id": "d1" })],
        );

        let (handle, mut rx) = harness.clients.register();
        harness
            .rooms
            .join(Room::Resource(ResourceKind::Drivers), handle.id);

        harness.engine.trigger(Trigger::Poll(ResourceKind::Drivers)).await;
        let good = recv_envelope(&mut rx).await;
        assert_eq!(good.event, "driversUpdate");

        let cached_before = harness
            .cache
            .get(CacheKey::Resource(ResourceKind::Drivers))
            .unwrap()
            .payload
            .to_string();

        harness.snapshots.fail_resources(true);
        harness.engine.trigger(Trigger::Poll(ResourceKind::Drivers)).await;

        let fallback = recv_envelope(&mut rx).await;
        assert_eq!(fallback.event, "driversUpdate");
        assert_eq!(fallback.data, good.data);

        let cached_after = harness
            .cache
            .get(CacheKey::Resource(ResourceKind::Drivers))
            .unwrap()
            .payload
            .to_string();
        assert_eq!(cached_before, cached_after);
    }

    #[tokio::test]
    async fn test_cold_start_failure_is_suppressed() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        harness.snapshots.fail_resources(true);

        let (handle, mut rx) = harness.clients.register();
        harness
            .rooms
            .join(Room::Resource(ResourceKind::Complaints), handle.id);

        harness
            .engine
            .trigger(Trigger::Poll(ResourceKind::Complaints))
            .await;

        assert!(try_recv_envelope(&mut rx).await.is_none());
        assert!(!harness
            .cache
            .contains(CacheKey::Resource(ResourceKind::Complaints)));
    }

    #[tokio::test]
    async fn test_tick_is_skipped_while_cycle_in_flight() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        harness.snapshots.set_delay_ms(80);

        let (handle, mut rx) = harness.clients.register();
        harness
            .rooms
            .join(Room::Resource(ResourceKind::Vehicles), handle.id);

        harness.engine.trigger(Trigger::Poll(ResourceKind::Vehicles)).await;
        // give the run loop time to enter the cycle
        time::sleep(Duration::from_millis(20)).await;
        assert!(harness.engine.is_busy());

        // a tick due mid-cycle is dropped, not queued
        harness.engine.tick().await;

        let update = recv_envelope(&mut rx).await;
        assert_eq!(update.event, "vehiclesUpdate");
        assert!(try_recv_envelope(&mut rx).await.is_none());

        // exactly one snapshot computation ran, and never concurrently
        assert_eq!(harness.snapshots.resource_fetches(), 1);
        assert_eq!(harness.snapshots.max_concurrent_fetches(), 1);
    }

    #[tokio::test]
    async fn test_refresh_acknowledges_requester_only() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;

        let (requester, mut requester_rx) = harness.clients.register();
        let (_other, mut other_rx) = harness.clients.register();

        harness
            .engine
            .trigger(Trigger::Refresh {
                kinds: vec![ResourceKind::Rides],
                requester: Some(requester.id),
            })
            .await;

        let ack = recv_envelope(&mut requester_rx).await;
        assert_eq!(ack.event, "refresh-complete");
        assert!(try_recv_envelope(&mut other_rx).await.is_none());
    }

    #[tokio::test]
    async fn test_tick_with_no_clients_fetches_nothing() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        harness.engine.tick().await;
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(harness.snapshots.resource_fetches(), 0);
    }
}
