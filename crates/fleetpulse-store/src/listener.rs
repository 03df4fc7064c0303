//! Postgres `LISTEN/NOTIFY` change source.
//!
//! The `fleet_notify_change` trigger (see `migrations/0002_change_notify.sql`)
//! emits one notification per row mutation on `fleet_changes_<table>`,
//! carrying `{op, id, doc?}`. The document is omitted when the payload
//! would exceed the NOTIFY size limit, so subscribers must tolerate
//! key-only events.

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::{PgListener, PgPool};
use tracing::warn;

use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::events::ChangeEvent;
use fleetpulse_core::resource::{ChangeOp, ResourceKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_core::traits::{ChangeSource, ChangeStream};

/// Notification channel name for a resource.
fn channel_name(kind: ResourceKind) -> String {
    format!("fleet_changes_{}", kind.as_str())
}

/// Raw trigger payload.
#[derive(Debug, Deserialize)]
struct NotifyPayload {
    op: String,
    id: serde_json::Value,
    #[serde(default)]
    doc: Option<serde_json::Value>,
}

/// Change source backed by Postgres `LISTEN/NOTIFY`.
#[derive(Debug, Clone)]
pub struct PgChangeSource {
    pool: PgPool,
    enabled: bool,
}

impl PgChangeSource {
    /// Create a change source over an existing pool. When `enabled` is
    /// false the watcher skips subscribing and polls instead.
    pub fn new(pool: PgPool, enabled: bool) -> Self {
        Self { pool, enabled }
    }
}

#[async_trait]
impl ChangeSource for PgChangeSource {
    async fn subscribe(&self, kind: ResourceKind) -> AppResult<Box<dyn ChangeStream>> {
        let mut listener = PgListener::connect_with(&self.pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Subscription,
                format!("Failed to open {kind} change listener"),
                e,
            )
        })?;

        listener.listen(&channel_name(kind)).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Subscription,
                format!("Failed to LISTEN on {kind} channel"),
                e,
            )
        })?;

        Ok(Box::new(PgChangeStream { kind, listener }))
    }

    fn supports_streams(&self) -> bool {
        self.enabled
    }
}

/// One live `LISTEN` subscription.
struct PgChangeStream {
    kind: ResourceKind,
    listener: PgListener,
}

#[async_trait]
impl ChangeStream for PgChangeStream {
    async fn next_change(&mut self) -> AppResult<ChangeEvent> {
        loop {
            let notification = self.listener.recv().await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Subscription,
                    format!("{} change subscription lost", self.kind),
                    e,
                )
            })?;

            match parse_notification(self.kind, notification.payload()) {
                Some(event) => return Ok(event),
                None => {
                    warn!(
                        resource = %self.kind,
                        payload = notification.payload(),
                        "Discarding unparseable change notification"
                    );
                }
            }
        }
    }
}

/// Parses a trigger payload into a normalized change event.
fn parse_notification(kind: ResourceKind, payload: &str) -> Option<ChangeEvent> {
    let raw: NotifyPayload = serde_json::from_str(payload).ok()?;
    let op = ChangeOp::parse(&raw.op)?;
    let id = match &raw.id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(ChangeEvent::new(kind, op, id, raw.doc))
}
