//! Admin entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An administrator account. The canonical query never selects credential
/// columns, so none appear here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminRow {
    /// Unique admin identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Role label, e.g. `superadmin`, `support`.
    pub role: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last modified.
    pub updated_at: DateTime<Utc>,
}

impl AdminRow {
    /// Wire document.
    pub fn wire(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
