//! Shared in-memory fakes and harness for engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration};

use fleetpulse_core::config::broadcast::BroadcastConfig;
use fleetpulse_core::config::realtime::RealtimeConfig;
use fleetpulse_core::config::reports::ReportsConfig;
use fleetpulse_core::error::AppError;
use fleetpulse_core::events::ChangeEvent;
use fleetpulse_core::report::ReportFilters;
use fleetpulse_core::resource::{ReportKind, ResourceKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_core::traits::{ChangeSource, ChangeStream, SnapshotSource};

use crate::broadcast::BroadcastEngine;
use crate::cache::PayloadCache;
use crate::connection::ClientRegistry;
use crate::lifecycle::ConnectionLifecycle;
use crate::message::Envelope;
use crate::reports::ReportEngine;
use crate::rooms::RoomRegistry;

/// Configurable in-memory snapshot source.
#[derive(Debug, Default)]
pub struct FakeSnapshots {
    docs: DashMap<ResourceKind, Vec<serde_json::Value>>,
    latest: DashMap<ResourceKind, DateTime<Utc>>,
    fail_resources: AtomicBool,
    fail_reports: AtomicBool,
    malformed_reports: AtomicBool,
    delay_ms: AtomicU64,
    resource_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSnapshots {
    pub fn set_docs(&self, kind: ResourceKind, docs: Vec<serde_json::Value>) {
        self.docs.insert(kind, docs);
    }

    pub fn set_latest_modified(&self, kind: ResourceKind, instant: DateTime<Utc>) {
        self.latest.insert(kind, instant);
    }

    pub fn fail_resources(&self, fail: bool) {
        self.fail_resources.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    pub fn malformed_reports(&self, malformed: bool) {
        self.malformed_reports.store(malformed, Ordering::SeqCst);
    }

    pub fn set_delay_ms(&self, delay: u64) {
        self.delay_ms.store(delay, Ordering::SeqCst);
    }

    pub fn resource_fetches(&self) -> usize {
        self.resource_fetches.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for FakeSnapshots {
    async fn fetch(&self, kind: ResourceKind) -> AppResult<Vec<serde_json::Value>> {
        self.resource_fetches.fetch_add(1, Ordering::SeqCst);
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(concurrent, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            time::sleep(Duration::from_millis(delay)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_resources.load(Ordering::SeqCst) {
            return Err(AppError::database("simulated query failure"));
        }
        Ok(self.docs.get(&kind).map(|d| d.clone()).unwrap_or_default())
    }

    async fn fetch_report(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> AppResult<serde_json::Value> {
        if self.fail_reports.load(Ordering::SeqCst) {
            return Err(AppError::database("simulated report failure"));
        }
        if self.malformed_reports.load(Ordering::SeqCst) {
            return Ok(serde_json::json!({ "bogus": true }));
        }
        // every payload echoes the filters so tests can assert personalization
        let payload = match kind {
            ReportKind::Earnings => serde_json::json!({
                "chartData": [{ "name": "2026-08-06", "earnings": 120, "rides": 6 }],
                "summary": { "totalEarnings": 120.0, "totalRides": 6 },
                "filters": filters.wire(),
                "hasData": true,
            }),
            ReportKind::DriverPerformance => serde_json::json!({
                "pieChartData": [],
                "tableData": [{ "id": "d1", "name": "John Smith", "rides": 4 }],
                "filters": filters.wire(),
                "hasData": true,
            }),
            ReportKind::RidesAnalysis => serde_json::json!({
                "chartData": [{ "name": "2026-08-06", "rides": 9 }],
                "serviceDistribution": { "labels": [], "data": [], "earnings": [] },
                "filters": filters.wire(),
                "hasData": true,
            }),
            ReportKind::ReportsSummary => serde_json::json!({
                "totalEarnings": 980.5,
                "totalRides": 41,
                "timeRange": filters.time_range.as_str(),
                "filters": filters.wire(),
            }),
        };
        Ok(payload)
    }

    async fn fetch_dashboard(&self) -> AppResult<serde_json::Value> {
        Ok(serde_json::json!({
            "todayRides": 12,
            "todayIncome": 340.0,
            "totalDrivers": 4,
        }))
    }

    async fn latest_modified(&self, kind: ResourceKind) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self.latest.get(&kind).map(|entry| *entry.value()))
    }
}

/// Scripted change subscription: yields its items, then pends forever.
#[derive(Debug)]
pub struct FakeSubscription {
    items: VecDeque<AppResult<ChangeEvent>>,
}

impl FakeSubscription {
    pub fn with_events(events: Vec<ChangeEvent>) -> Self {
        Self {
            items: events.into_iter().map(Ok).collect(),
        }
    }

    pub fn erroring(error: AppError) -> Self {
        Self {
            items: VecDeque::from([Err(error)]),
        }
    }

    fn pending() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

#[async_trait]
impl ChangeStream for FakeSubscription {
    async fn next_change(&mut self) -> AppResult<ChangeEvent> {
        match self.items.pop_front() {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }
}

/// Scripted change source with per-resource subscription queues.
#[derive(Debug, Default)]
pub struct FakeChanges {
    script: DashMap<ResourceKind, VecDeque<FakeSubscription>>,
    calls: DashMap<ResourceKind, usize>,
    unsupported: bool,
}

impl FakeChanges {
    /// A source that reports change streams unsupported.
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Default::default()
        }
    }

    pub fn push_subscription(&self, kind: ResourceKind, subscription: FakeSubscription) {
        self.script.entry(kind).or_default().push_back(subscription);
    }

    pub fn subscribe_calls(&self, kind: ResourceKind) -> usize {
        self.calls.get(&kind).map(|entry| *entry.value()).unwrap_or(0)
    }
}

#[async_trait]
impl ChangeSource for FakeChanges {
    async fn subscribe(&self, kind: ResourceKind) -> AppResult<Box<dyn ChangeStream>> {
        *self.calls.entry(kind).or_insert(0) += 1;
        let subscription = self
            .script
            .get_mut(&kind)
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(FakeSubscription::pending);
        Ok(Box::new(subscription))
    }

    fn supports_streams(&self) -> bool {
        !self.unsupported
    }
}

/// A running broadcast stack over fakes: registries, cache, both engines,
/// and the lifecycle manager, with the broadcast loop spawned.
pub struct TestHarness {
    pub snapshots: Arc<FakeSnapshots>,
    pub clients: Arc<ClientRegistry>,
    pub rooms: Arc<RoomRegistry>,
    pub cache: Arc<PayloadCache>,
    pub engine: Arc<BroadcastEngine>,
    pub reports: Arc<ReportEngine>,
    pub lifecycle: Arc<ConnectionLifecycle>,
    _shutdown_tx: watch::Sender<bool>,
}

impl TestHarness {
    pub async fn start(snapshots: FakeSnapshots) -> Self {
        let snapshots = Arc::new(snapshots);
        let clients = Arc::new(ClientRegistry::new(64));
        let rooms = Arc::new(RoomRegistry::new());
        let cache = Arc::new(PayloadCache::new());

        let broadcast_config = BroadcastConfig {
            change_debounce_ms: 0,
            refresh_interval_seconds: 0,
            ..Default::default()
        };
        let (engine, rx) = BroadcastEngine::new(
            snapshots.clone() as Arc<dyn SnapshotSource>,
            Arc::clone(&clients),
            Arc::clone(&rooms),
            Arc::clone(&cache),
            broadcast_config,
        );
        let engine = Arc::new(engine);

        let reports = Arc::new(ReportEngine::new(
            snapshots.clone() as Arc<dyn SnapshotSource>,
            Arc::clone(&clients),
            Arc::clone(&cache),
            ReportsConfig::default(),
        ));

        let lifecycle = Arc::new(ConnectionLifecycle::new(
            Arc::clone(&clients),
            Arc::clone(&rooms),
            Arc::clone(&cache),
            Arc::clone(&engine),
            Arc::clone(&reports),
            RealtimeConfig::default(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(Arc::clone(&engine).run(rx, shutdown_rx));

        Self {
            snapshots,
            clients,
            rooms,
            cache,
            engine,
            reports,
            lifecycle,
            _shutdown_tx: shutdown_tx,
        }
    }
}

/// Receives the next frame, panicking after a 2 s deadline.
pub async fn recv_envelope(rx: &mut mpsc::Receiver<String>) -> Envelope {
    let text = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("connection closed");
    serde_json::from_str(&text).expect("invalid frame")
}

/// Returns the next frame if one arrives within a short grace window.
pub async fn try_recv_envelope(rx: &mut mpsc::Receiver<String>) -> Option<Envelope> {
    match tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
        Ok(Some(text)) => Some(serde_json::from_str(&text).expect("invalid frame")),
        _ => None,
    }
}
