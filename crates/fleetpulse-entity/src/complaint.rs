//! Complaint entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A customer complaint, joined with the vehicle's plate and the driver's
/// contact fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintRow {
    /// Unique complaint identifier.
    pub id: Uuid,
    /// Complaining customer's name.
    pub customer_name: String,
    /// Complaining customer's phone.
    pub customer_phone: String,
    /// The vehicle the complaint is about.
    pub vehicle_id: Uuid,
    /// Vehicle registration plate (joined).
    pub vehicle_registration: Option<String>,
    /// The driver the complaint is about.
    pub driver_id: Uuid,
    /// Driver name (joined).
    pub driver_name: Option<String>,
    /// Driver phone (joined).
    pub driver_phone: Option<String>,
    /// Complaint text.
    pub description: String,
    /// Status: Pending, Investigating, Resolved, Refunded.
    pub status: String,
    /// Resolution notes, once resolved.
    pub resolution_notes: Option<String>,
    /// When the complaint was filed.
    pub created_at: DateTime<Utc>,
    /// When the complaint was last modified.
    pub updated_at: DateTime<Utc>,
}

impl ComplaintRow {
    /// Wire document with the vehicle and driver references nested.
    pub fn wire(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "customerName": self.customer_name,
            "customerPhone": self.customer_phone,
            "vehicle": {
                "id": self.vehicle_id,
                "registrationNumber": self.vehicle_registration,
            },
            "driver": {
                "id": self.driver_id,
                "name": self.driver_name,
                "phone": self.driver_phone,
            },
            "description": self.description,
            "status": self.status,
            "resolutionNotes": self.resolution_notes,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
        })
    }
}
