//! Personalized report engine.
//!
//! Unlike the collection broadcasts, report payloads are computed once per
//! client from that client's own last-submitted filters: two dashboard
//! users looking at different date ranges must never receive each other's
//! view. Direct requests are answered immediately; periodic timers
//! recompute and re-push for every client that has previously submitted
//! filters for that report kind, and skip everyone else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

use fleetpulse_core::config::reports::ReportsConfig;
use fleetpulse_core::report::{RawReportParams, ReportFilters};
use fleetpulse_core::resource::ReportKind;
use fleetpulse_core::traits::SnapshotSource;

use crate::cache::{CacheKey, PayloadCache};
use crate::connection::{ClientHandle, ClientRegistry};
use crate::message::{outbound, Envelope};

/// Per-client report computation and periodic re-push.
pub struct ReportEngine {
    snapshots: Arc<dyn SnapshotSource>,
    clients: Arc<ClientRegistry>,
    cache: Arc<PayloadCache>,
    config: ReportsConfig,
    broadcast_in_progress: AtomicBool,
}

impl std::fmt::Debug for ReportEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportEngine").finish()
    }
}

impl ReportEngine {
    /// Creates the engine.
    pub fn new(
        snapshots: Arc<dyn SnapshotSource>,
        clients: Arc<ClientRegistry>,
        cache: Arc<PayloadCache>,
        config: ReportsConfig,
    ) -> Self {
        Self {
            snapshots,
            clients,
            cache,
            config,
            broadcast_in_progress: AtomicBool::new(false),
        }
    }

    /// Handles a client's report request.
    ///
    /// Malformed parameters are rejected to the requesting client only.
    /// Valid filters are recorded on the session before computing, so the
    /// periodic timers pick this client up from now on. The client always
    /// receives a frame: fresh data, its own cached copy, the global
    /// cached copy, or the zeroed placeholder.
    pub async fn handle_request(
        &self,
        client: &Arc<ClientHandle>,
        kind: ReportKind,
        params: Option<RawReportParams>,
    ) {
        let raw = params.unwrap_or_default();
        let filters = match ReportFilters::parse(&raw, kind, self.config.max_range_days) {
            Ok(filters) => filters,
            Err(e) => {
                debug!(client_id = %client.id, report = %kind, error = %e, "Rejecting report request");
                let _ = client.send(&outbound::report_error(&e.message)).await;
                return;
            }
        };

        client.set_filters(kind, filters).await;

        match self.compute(kind, &filters).await {
            Some(payload) => {
                self.cache.store(CacheKey::Report(kind), payload.clone());
                client.cache_report(kind, payload.clone()).await;
                let _ = client.send(&Envelope::new(kind.data_event(), payload)).await;
            }
            None => {
                // per-client cache first: it reflects this client's filters
                let fallback = match client.cached_report(kind).await {
                    Some(own) => own,
                    None => match self.cache.get(CacheKey::Report(kind)) {
                        Some(global) => global.payload,
                        None => kind.placeholder(),
                    },
                };
                let _ = client.send(&Envelope::new(kind.data_event(), fallback)).await;
            }
        }
    }

    /// Computes and validates one payload. `None` covers both query
    /// failure and a structurally invalid result; the two are handled
    /// identically downstream.
    async fn compute(
        &self,
        kind: ReportKind,
        filters: &ReportFilters,
    ) -> Option<serde_json::Value> {
        match self.snapshots.fetch_report(kind, filters).await {
            Ok(payload) if kind.validate(&payload) => Some(payload),
            Ok(_) => {
                warn!(report = %kind, "Discarding report payload that failed validation");
                None
            }
            Err(e) => {
                warn!(report = %kind, error = %e, "Report computation failed");
                None
            }
        }
    }

    /// Recomputes and re-pushes one report kind for every client that has
    /// submitted filters for it. Guarded: overlapping sweeps are skipped.
    pub async fn broadcast_kind(&self, kind: ReportKind) {
        if self.clients.is_empty() {
            return;
        }
        if self
            .broadcast_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(report = %kind, "Report broadcast already in progress, skipping");
            return;
        }

        let mut pushed = 0usize;
        for client in self.clients.all() {
            let Some(filters) = client.filters_for(kind).await else {
                continue;
            };
            if let Some(payload) = self.compute(kind, &filters).await {
                client.cache_report(kind, payload.clone()).await;
                if client
                    .send(&Envelope::new(kind.update_event(), payload))
                    .await
                {
                    pushed += 1;
                }
            }
        }
        debug!(report = %kind, pushed, "Personalized report sweep complete");

        self.broadcast_in_progress.store(false, Ordering::SeqCst);
    }

    /// Spawns the periodic report timers: summaries on the short interval,
    /// the heavier earnings aggregation on the long one.
    pub fn spawn_timers(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        handles.push(self.spawn_kind_timer(
            ReportKind::ReportsSummary,
            Duration::from_secs(self.config.summary_interval_seconds),
            shutdown.clone(),
        ));
        handles.push(self.spawn_kind_timer(
            ReportKind::Earnings,
            Duration::from_secs(self.config.earnings_interval_seconds),
            shutdown,
        ));
        handles
    }

    fn spawn_kind_timer(
        self: &Arc<Self>,
        kind: ReportKind,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = time::interval(period.max(Duration::from_secs(1)));
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            interval.tick().await;
            info!(report = %kind, period_seconds = period.as_secs(), "Report timer started");
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => engine.broadcast_kind(kind).await,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{recv_envelope, try_recv_envelope, FakeSnapshots, TestHarness};

    #[tokio::test]
    async fn test_request_returns_personalized_payload() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (client, mut rx) = harness.clients.register();

        harness
            .reports
            .handle_request(
                &client,
                ReportKind::Earnings,
                Some(RawReportParams {
                    time_range: Some("month".into()),
                    ..Default::default()
                }),
            )
            .await;

        let frame = recv_envelope(&mut rx).await;
        assert_eq!(frame.event, "earningsReportData");
        assert_eq!(frame.data["filters"]["timeRange"], "month");
    }

    #[tokio::test]
    async fn test_malformed_request_errors_requester_only() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (bad, mut bad_rx) = harness.clients.register();
        let (_good, mut good_rx) = harness.clients.register();

        harness
            .reports
            .handle_request(
                &bad,
                ReportKind::Earnings,
                Some(RawReportParams {
                    time_range: Some("quarter".into()),
                    ..Default::default()
                }),
            )
            .await;

        let frame = recv_envelope(&mut bad_rx).await;
        assert_eq!(frame.event, "reportError");
        assert!(frame.data["message"]
            .as_str()
            .unwrap()
            .contains("Invalid time range"));
        assert!(try_recv_envelope(&mut good_rx).await.is_none());
        // rejected filters are never recorded
        assert!(bad.filters_for(ReportKind::Earnings).await.is_none());
    }

    #[tokio::test]
    async fn test_periodic_push_respects_each_clients_filters() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (client_a, mut rx_a) = harness.clients.register();
        let (client_b, mut rx_b) = harness.clients.register();

        for (client, rx, range) in [
            (&client_a, &mut rx_a, "day"),
            (&client_b, &mut rx_b, "month"),
        ] {
            harness
                .reports
                .handle_request(
                    client,
                    ReportKind::Earnings,
                    Some(RawReportParams {
                        time_range: Some(range.into()),
                        ..Default::default()
                    }),
                )
                .await;
            recv_envelope(rx).await;
        }

        harness.reports.broadcast_kind(ReportKind::Earnings).await;

        let update_a = recv_envelope(&mut rx_a).await;
        let update_b = recv_envelope(&mut rx_b).await;
        assert_eq!(update_a.event, "earningsReportUpdate");
        assert_eq!(update_a.data["filters"]["timeRange"], "day");
        assert_eq!(update_b.data["filters"]["timeRange"], "month");
    }

    #[tokio::test]
    async fn test_periodic_push_skips_clients_without_filters() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (client_a, mut rx_a) = harness.clients.register();
        let (_client_b, mut rx_b) = harness.clients.register();

        harness
            .reports
            .handle_request(&client_a, ReportKind::ReportsSummary, None)
            .await;
        recv_envelope(&mut rx_a).await;

        harness
            .reports
            .broadcast_kind(ReportKind::ReportsSummary)
            .await;

        assert_eq!(
            recv_envelope(&mut rx_a).await.event,
            "reportsSummaryUpdate"
        );
        assert!(try_recv_envelope(&mut rx_b).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_payload_falls_back_to_clients_own_cache() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (client, mut rx) = harness.clients.register();

        harness
            .reports
            .handle_request(&client, ReportKind::Earnings, None)
            .await;
        let good = recv_envelope(&mut rx).await;
        assert_eq!(good.event, "earningsReportData");

        let global_before = harness
            .cache
            .get(CacheKey::Report(ReportKind::Earnings))
            .unwrap()
            .payload
            .to_string();

        harness.snapshots.malformed_reports(true);
        harness
            .reports
            .handle_request(&client, ReportKind::Earnings, None)
            .await;

        let fallback = recv_envelope(&mut rx).await;
        assert_eq!(fallback.data, good.data);

        // a failed validation never overwrites the global cache
        let global_after = harness
            .cache
            .get(CacheKey::Report(ReportKind::Earnings))
            .unwrap()
            .payload
            .to_string();
        assert_eq!(global_before, global_after);
    }

    #[tokio::test]
    async fn test_cold_start_failure_yields_placeholder() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        harness.snapshots.fail_reports(true);
        let (client, mut rx) = harness.clients.register();

        harness
            .reports
            .handle_request(&client, ReportKind::DriverPerformance, None)
            .await;

        let frame = recv_envelope(&mut rx).await;
        assert_eq!(frame.event, "driverPerformanceData");
        assert_eq!(frame.data["hasData"], false);
        assert_eq!(frame.data["tableData"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_changing_one_clients_filters_leaves_the_other_untouched() {
        let harness = TestHarness::start(FakeSnapshots::default()).await;
        let (client_a, mut rx_a) = harness.clients.register();
        let (client_b, mut rx_b) = harness.clients.register();

        for (client, rx) in [(&client_a, &mut rx_a), (&client_b, &mut rx_b)] {
            harness
                .reports
                .handle_request(
                    client,
                    ReportKind::Earnings,
                    Some(RawReportParams {
                        time_range: Some("week".into()),
                        ..Default::default()
                    }),
                )
                .await;
            recv_envelope(rx).await;
        }

        // A switches to day; B's stored filters must not move
        harness
            .reports
            .handle_request(
                &client_a,
                ReportKind::Earnings,
                Some(RawReportParams {
                    time_range: Some("day".into()),
                    ..Default::default()
                }),
            )
            .await;
        recv_envelope(&mut rx_a).await;

        harness.reports.broadcast_kind(ReportKind::Earnings).await;
        assert_eq!(
            recv_envelope(&mut rx_a).await.data["filters"]["timeRange"],
            "day"
        );
        assert_eq!(
            recv_envelope(&mut rx_b).await.data["filters"]["timeRange"],
            "week"
        );
    }
}
