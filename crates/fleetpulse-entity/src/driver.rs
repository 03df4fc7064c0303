//! Driver entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A driver.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverRow {
    /// Unique driver identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: String,
    /// Assigned vehicle description, if any.
    pub vehicle: Option<String>,
    /// Assigned vehicle plate, if any.
    pub license_plate: Option<String>,
    /// KYC status: Pending, Verified, Rejected.
    pub kyc_status: String,
    /// Whether the driver is currently online.
    pub is_online: bool,
    /// Average rating.
    pub rating: f64,
    /// When the driver joined the fleet.
    pub joined_at: DateTime<Utc>,
    /// Last status/location update.
    pub last_update: DateTime<Utc>,
}

impl DriverRow {
    /// Wire document.
    pub fn wire(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
