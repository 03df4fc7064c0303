//! Connection lifecycle: onboarding, message dispatch, and stale-session
//! eviction.
//!
//! New observers are seeded from the payload cache immediately; the first
//! paint must never be empty when any data has ever been computed. Idle
//! sessions are swept on a timer; report clients get a longer threshold
//! because their only traffic is the periodic pushes they wait for.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

use fleetpulse_core::config::realtime::RealtimeConfig;
use fleetpulse_core::resource::{ReportKind, ResourceKind, Room};

use crate::broadcast::{BroadcastEngine, Trigger};
use crate::cache::{CacheKey, PayloadCache};
use crate::connection::{ClientHandle, ClientId, ClientRegistry};
use crate::message::{outbound, Envelope, InboundMessage};
use crate::reports::ReportEngine;
use crate::rooms::RoomRegistry;

/// Event name for dashboard stat pushes.
const DASHBOARD_EVENT: &str = "dashboardStats";

/// Accepts connections, dispatches inbound frames, and evicts stale
/// sessions.
pub struct ConnectionLifecycle {
    clients: Arc<ClientRegistry>,
    rooms: Arc<RoomRegistry>,
    cache: Arc<PayloadCache>,
    broadcast: Arc<BroadcastEngine>,
    reports: Arc<ReportEngine>,
    config: RealtimeConfig,
}

impl std::fmt::Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLifecycle").finish()
    }
}

impl ConnectionLifecycle {
    /// Creates the lifecycle manager.
    pub fn new(
        clients: Arc<ClientRegistry>,
        rooms: Arc<RoomRegistry>,
        cache: Arc<PayloadCache>,
        broadcast: Arc<BroadcastEngine>,
        reports: Arc<ReportEngine>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            clients,
            rooms,
            cache,
            broadcast,
            reports,
            config,
        }
    }

    /// Registers a new observer: confirmation frame, default room, and an
    /// immediate seed from the dashboard cache.
    pub async fn on_connect(&self) -> (Arc<ClientHandle>, mpsc::Receiver<String>) {
        let (handle, rx) = self.clients.register();

        let _ = handle.send(&outbound::connection_established(handle.id)).await;

        self.rooms.join(Room::Dashboard, handle.id);
        if let Some(cached) = self.cache.get(CacheKey::Dashboard) {
            let _ = handle
                .send(&Envelope::new(DASHBOARD_EVENT, cached.payload))
                .await;
        }

        info!(
            client_id = %handle.id,
            total = self.clients.count(),
            "Observer connected"
        );
        (handle, rx)
    }

    /// Removes an observer and all of its room memberships.
    pub async fn on_disconnect(&self, id: ClientId) {
        self.rooms.leave_all(id);
        if let Some(handle) = self.clients.remove(&id) {
            handle.close();
            info!(
                client_id = %id,
                total = self.clients.count(),
                "Observer disconnected"
            );
        }
    }

    /// Dispatches one inbound frame. Every frame refreshes the session's
    /// activity clock; malformed frames are answered with an error to the
    /// sender only.
    pub async fn handle_message(&self, handle: &Arc<ClientHandle>, text: &str) {
        handle.touch().await;

        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(client_id = %handle.id, error = %e, "Unparseable frame");
                let _ = handle
                    .send(&outbound::error(&format!("Failed to parse message: {e}")))
                    .await;
                return;
            }
        };

        match message {
            InboundMessage::JoinRoom(room) => self.handle_join(handle, &room).await,
            InboundMessage::LeaveRoom(room) => match Room::parse(&room) {
                Some(room) => self.rooms.leave(room, handle.id),
                None => debug!(client_id = %handle.id, room, "Leave for unknown room ignored"),
            },
            InboundMessage::ClientConnected(_) => {
                let _ = handle.send(&outbound::server_welcome(handle.id)).await;
                self.seed_all(handle).await;
            }
            InboundMessage::ClientHeartbeat(_) => {
                let _ = handle.send(&outbound::server_heartbeat()).await;
            }
            InboundMessage::GetLatestData(request) => match ResourceKind::parse(&request.model) {
                Some(kind) => {
                    self.broadcast
                        .trigger(Trigger::Refresh {
                            kinds: vec![kind],
                            requester: None,
                        })
                        .await;
                }
                None => {
                    let _ = handle
                        .send(&outbound::error(&format!(
                            "Unknown model: {}",
                            request.model
                        )))
                        .await;
                }
            },
            InboundMessage::RefreshData(body) => {
                let kinds = match body.and_then(|b| b.models) {
                    Some(models) => models
                        .iter()
                        .filter_map(|name| {
                            let kind = ResourceKind::parse(name);
                            if kind.is_none() {
                                warn!(client_id = %handle.id, model = %name, "Skipping unknown model in refresh");
                            }
                            kind
                        })
                        .collect(),
                    None => ResourceKind::ALL.to_vec(),
                };
                self.broadcast
                    .trigger(Trigger::Refresh {
                        kinds,
                        requester: Some(handle.id),
                    })
                    .await;
            }
            InboundMessage::RequestEarningsReport(params) => {
                self.reports
                    .handle_request(handle, ReportKind::Earnings, params)
                    .await;
            }
            InboundMessage::RequestDriverPerformance(params) => {
                self.reports
                    .handle_request(handle, ReportKind::DriverPerformance, params)
                    .await;
            }
            InboundMessage::RequestRidesAnalysis(params) => {
                self.reports
                    .handle_request(handle, ReportKind::RidesAnalysis, params)
                    .await;
            }
            InboundMessage::RequestReportsSummary(params) => {
                self.reports
                    .handle_request(handle, ReportKind::ReportsSummary, params)
                    .await;
            }
        }
    }

    /// Joins a room and immediately seeds the member from the cache.
    async fn handle_join(&self, handle: &Arc<ClientHandle>, room_name: &str) {
        let Some(room) = Room::parse(room_name) else {
            let _ = handle
                .send(&outbound::error(&format!("Unknown room: {room_name}")))
                .await;
            return;
        };

        self.rooms.join(room, handle.id);
        debug!(client_id = %handle.id, room = %room, "Joined room");

        match room {
            Room::Dashboard => {
                if let Some(cached) = self.cache.get(CacheKey::Dashboard) {
                    let _ = handle
                        .send(&Envelope::new(DASHBOARD_EVENT, cached.payload))
                        .await;
                }
            }
            Room::Resource(kind) => {
                if let Some(cached) = self.cache.get(CacheKey::Resource(kind)) {
                    let _ = handle
                        .send(&Envelope::new(kind.update_event(), cached.payload))
                        .await;
                }
            }
            Room::Reports => {
                for kind in ReportKind::ALL {
                    if let Some(cached) = self.cache.get(CacheKey::Report(kind)) {
                        let _ = handle
                            .send(&Envelope::new(kind.data_event(), cached.payload))
                            .await;
                    }
                }
            }
        }
    }

    /// Seeds a confirmed client with every cached collection snapshot plus
    /// the dashboard stats.
    async fn seed_all(&self, handle: &Arc<ClientHandle>) {
        for kind in ResourceKind::ALL {
            if let Some(cached) = self.cache.get(CacheKey::Resource(kind)) {
                let _ = handle
                    .send(&Envelope::new(kind.update_event(), cached.payload))
                    .await;
            }
        }
        if let Some(cached) = self.cache.get(CacheKey::Dashboard) {
            let _ = handle
                .send(&Envelope::new(DASHBOARD_EVENT, cached.payload))
                .await;
        }
        debug!(client_id = %handle.id, "Initial data seeded");
    }

    /// One eviction pass: disconnect every session idle past its
    /// threshold. Sessions that have submitted report filters use the
    /// longer report threshold.
    pub async fn sweep_stale(&self) {
        let now = Utc::now();
        let general = chrono::Duration::seconds(self.config.idle_timeout_seconds as i64);
        let reports = chrono::Duration::seconds(self.config.report_idle_timeout_seconds as i64);

        for handle in self.clients.all() {
            let idle = now - handle.last_activity().await;
            let threshold = if handle.has_any_filters().await {
                reports
            } else {
                general
            };
            if idle > threshold {
                info!(
                    client_id = %handle.id,
                    idle_seconds = idle.num_seconds(),
                    "Evicting stale connection"
                );
                self.rooms.leave_all(handle.id);
                self.clients.remove(&handle.id);
                handle.close();
            }
        }
    }

    /// Spawns the periodic eviction sweep.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let lifecycle = Arc::clone(self);
        let period = Duration::from_secs(lifecycle.config.sweep_interval_seconds.max(1));
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            interval.tick().await;
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => lifecycle.sweep_stale().await,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{recv_envelope, try_recv_envelope, FakeSnapshots, TestHarness};
    use fleetpulse_core::report::RawReportParams;

    #[tokio::test]
    async fn test_connect_sends_confirmation_and_joins_dashboard() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (handle, mut rx) = harness.lifecycle.on_connect().await;

        let frame = recv_envelope(&mut rx).await;
        assert_eq!(frame.event, "connection-established");
        assert!(harness.rooms.is_member(Room::Dashboard, handle.id));
    }

    #[tokio::test]
    async fn test_join_after_broadcast_seeds_last_payload() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        harness.snapshots.set_docs(
            ResourceKind::Vehicles,
            vec![serde_json::json!({ "id": "v1" })],
        );

        // an earlier observer triggers a successful broadcast
        let (member, mut member_rx) = harness.lifecycle.on_connect().await;
        recv_envelope(&mut member_rx).await; // connection-established
        harness
            .lifecycle
            .handle_message(&member, r#"{"event":"join-room","data":"vehicles"}"#)
            .await;
        harness
            .engine
            .trigger(Trigger::Poll(ResourceKind::Vehicles))
            .await;
        let broadcast = recv_envelope(&mut member_rx).await;
        assert_eq!(broadcast.event, "vehiclesUpdate");

        // a new observer joining the room is seeded without waiting
        let (late, mut late_rx) = harness.lifecycle.on_connect().await;
        recv_envelope(&mut late_rx).await; // connection-established
        let _ = try_recv_envelope(&mut late_rx).await; // dashboard seed, if cached
        harness
            .lifecycle
            .handle_message(&late, r#"{"event":"join-room","data":"vehicles"}"#)
            .await;

        let seeded = recv_envelope(&mut late_rx).await;
        assert_eq!(seeded.event, "vehiclesUpdate");
        assert_eq!(seeded.data, broadcast.data);
    }

    #[tokio::test]
    async fn test_cold_start_join_receives_nothing() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (handle, mut rx) = harness.lifecycle.on_connect().await;
        recv_envelope(&mut rx).await; // connection-established

        harness
            .lifecycle
            .handle_message(&handle, r#"{"event":"join-room","data":"drivers"}"#)
            .await;
        assert!(try_recv_envelope(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_room_is_rejected() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (handle, mut rx) = harness.lifecycle.on_connect().await;
        recv_envelope(&mut rx).await;

        harness
            .lifecycle
            .handle_message(&handle, r#"{"event":"join-room","data":"billing"}"#)
            .await;
        let frame = recv_envelope(&mut rx).await;
        assert_eq!(frame.event, "error");
        assert!(frame.data["message"].as_str().unwrap().contains("billing"));
    }

    #[tokio::test]
    async fn test_heartbeat_is_answered() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (handle, mut rx) = harness.lifecycle.on_connect().await;
        recv_envelope(&mut rx).await;

        harness
            .lifecycle
            .handle_message(&handle, r#"{"event":"client-heartbeat"}"#)
            .await;
        assert_eq!(recv_envelope(&mut rx).await.event, "server-heartbeat");
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_stale_sessions() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (stale, _stale_rx) = harness.lifecycle.on_connect().await;
        let (active, _active_rx) = harness.lifecycle.on_connect().await;

        stale
            .backdate_activity(Utc::now() - chrono::Duration::seconds(600))
            .await;

        harness.lifecycle.sweep_stale().await;

        assert!(harness.clients.get(&stale.id).is_none());
        assert!(!stale.is_alive());
        assert!(!harness.rooms.is_member(Room::Dashboard, stale.id));

        assert!(harness.clients.get(&active.id).is_some());
        assert!(active.is_alive());
    }

    #[tokio::test]
    async fn test_report_clients_use_longer_idle_threshold() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (reporter, mut rx) = harness.lifecycle.on_connect().await;
        recv_envelope(&mut rx).await;

        harness
            .reports
            .handle_request(&reporter, ReportKind::Earnings, Some(RawReportParams::default()))
            .await;
        recv_envelope(&mut rx).await;

        // past the general threshold (300s) but inside the report one (1800s)
        reporter
            .backdate_activity(Utc::now() - chrono::Duration::seconds(600))
            .await;
        harness.lifecycle.sweep_stale().await;
        assert!(harness.clients.get(&reporter.id).is_some());

        // past the report threshold too
        reporter
            .backdate_activity(Utc::now() - chrono::Duration::seconds(3600))
            .await;
        harness.lifecycle.sweep_stale().await;
        assert!(harness.clients.get(&reporter.id).is_none());
    }

    #[tokio::test]
    async fn test_client_connected_seeds_all_cached_collections() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        harness
            .snapshots
            .set_docs(ResourceKind::Rides, vec![serde_json::json!({ "id": "r1" })]);

        // populate the rides and dashboard caches
        harness.engine.trigger(Trigger::Poll(ResourceKind::Rides)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let (handle, mut rx) = harness.lifecycle.on_connect().await;
        recv_envelope(&mut rx).await; // connection-established
        let _ = try_recv_envelope(&mut rx).await; // dashboard seed

        harness
            .lifecycle
            .handle_message(&handle, r#"{"event":"client-connected","data":{"page":"fleet"}}"#)
            .await;

        let welcome = recv_envelope(&mut rx).await;
        assert_eq!(welcome.event, "server-welcome");

        let mut events = Vec::new();
        while let Some(frame) = try_recv_envelope(&mut rx).await {
            events.push(frame.event);
        }
        assert!(events.contains(&"ridesUpdate".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error_reply() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (handle, mut rx) = harness.lifecycle.on_connect().await;
        recv_envelope(&mut rx).await;

        harness.lifecycle.handle_message(&handle, "{{{{").await;
        let frame = recv_envelope(&mut rx).await;
        assert_eq!(frame.event, "error");
    }
}
