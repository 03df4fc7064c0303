//! Individual observer connection handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use fleetpulse_core::report::ReportFilters;
use fleetpulse_core::resource::ReportKind;

use crate::message::Envelope;

/// Unique connection identifier.
pub type ClientId = Uuid;

/// A handle to a single connected observer.
///
/// Holds the sender side of the connection's outbound queue plus the
/// session state the engines read: last activity, per-report filters, and
/// the client's own last-good report payloads.
#[derive(Debug)]
pub struct ClientHandle {
    /// Unique connection ID.
    pub id: ClientId,
    /// Sender for outbound text frames.
    sender: mpsc::Sender<String>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last inbound activity.
    last_activity: RwLock<DateTime<Utc>>,
    /// Per-report filters, recorded on each report request.
    filters: RwLock<HashMap<ReportKind, ReportFilters>>,
    /// The client's own last validated report payloads.
    last_reports: RwLock<HashMap<ReportKind, serde_json::Value>>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
    /// Signalled when the server closes the connection.
    closed_tx: watch::Sender<bool>,
}

impl ClientHandle {
    /// Creates a handle and the receiver end of its outbound queue.
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            sender: tx,
            connected_at: Utc::now(),
            last_activity: RwLock::new(Utc::now()),
            filters: RwLock::new(HashMap::new()),
            last_reports: RwLock::new(HashMap::new()),
            alive: AtomicBool::new(true),
            closed_tx: watch::channel(false).0,
        };
        (handle, rx)
    }

    /// Sends a pre-serialized frame to this connection.
    pub async fn send_text(&self, text: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(client_id = %self.id, "Send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close();
                false
            }
        }
    }

    /// Serializes and sends an envelope.
    pub async fn send(&self, envelope: &Envelope) -> bool {
        self.send_text(envelope.to_text()).await
    }

    /// Whether the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the connection closed and wakes the transport tasks.
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let _ = self.closed_tx.send(true);
    }

    /// Resolves when the server closes this connection.
    pub async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Refreshes the last-activity timestamp.
    pub async fn touch(&self) {
        *self.last_activity.write().await = Utc::now();
    }

    /// Last inbound activity.
    pub async fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().await
    }

    /// Records the filters a client submitted for a report kind.
    pub async fn set_filters(&self, kind: ReportKind, filters: ReportFilters) {
        self.filters.write().await.insert(kind, filters);
    }

    /// Filters previously submitted for a report kind, if any.
    pub async fn filters_for(&self, kind: ReportKind) -> Option<ReportFilters> {
        self.filters.read().await.get(&kind).copied()
    }

    /// Whether the client has submitted filters for any report kind.
    pub async fn has_any_filters(&self) -> bool {
        !self.filters.read().await.is_empty()
    }

    /// Stores the client's own last validated payload for a report kind.
    pub async fn cache_report(&self, kind: ReportKind, payload: serde_json::Value) {
        self.last_reports.write().await.insert(kind, payload);
    }

    /// The client's own last validated payload for a report kind.
    pub async fn cached_report(&self, kind: ReportKind) -> Option<serde_json::Value> {
        self.last_reports.read().await.get(&kind).cloned()
    }

    /// Rewind the activity clock, for eviction tests.
    #[cfg(test)]
    pub(crate) async fn backdate_activity(&self, instant: DateTime<Utc>) {
        *self.last_activity.write().await = instant;
    }
}
