//! Normalized change events produced by the change watcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::{ChangeOp, ResourceKind};

/// A normalized notification that underlying data for a resource changed.
///
/// Ephemeral, never persisted. Triggers one broadcast cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The collection that changed.
    pub resource: ResourceKind,
    /// The kind of mutation.
    pub op: ChangeOp,
    /// Primary key of the affected document.
    pub document_id: String,
    /// The full document after the change, when the notification carried it.
    /// Deletes (and oversized payloads) only carry the key.
    pub full_document: Option<serde_json::Value>,
    /// When the change was observed.
    pub occurred_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates a change event observed now.
    pub fn new(
        resource: ResourceKind,
        op: ChangeOp,
        document_id: impl Into<String>,
        full_document: Option<serde_json::Value>,
    ) -> Self {
        Self {
            resource,
            op,
            document_id: document_id.into(),
            full_document,
            occurred_at: Utc::now(),
        }
    }

    /// The advisory payload pushed alongside the coalesced update:
    /// the full document when available, otherwise just the key.
    pub fn advisory_data(&self) -> serde_json::Value {
        match &self.full_document {
            Some(doc) => doc.clone(),
            None => serde_json::json!({ "id": self.document_id }),
        }
    }
}
