//! Vehicle entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A fleet vehicle, joined with its assigned driver's contact fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRow {
    /// Unique vehicle identifier.
    pub id: Uuid,
    /// Registration plate, e.g. `GJ01AB1234`.
    pub registration_number: String,
    /// Vehicle class: Car, Bike, Electric vehicle, Truck, Van.
    pub vehicle_type: String,
    /// Manufacturer model name.
    pub model: String,
    /// Operational status: Active, Inactive, Maintenance.
    pub status: String,
    /// Assigned driver, if any.
    pub assigned_driver_id: Option<Uuid>,
    /// Assigned driver's name (joined).
    pub assigned_driver_name: Option<String>,
    /// Assigned driver's phone (joined).
    pub assigned_driver_phone: Option<String>,
    /// Whether the assigned driver passed KYC (joined).
    pub assigned_driver_verified: Option<bool>,
    /// When the vehicle was registered.
    pub created_at: DateTime<Utc>,
    /// When the vehicle was last modified.
    pub updated_at: DateTime<Utc>,
}

impl VehicleRow {
    /// Wire document with the assigned driver nested the way dashboards
    /// consume it.
    pub fn wire(&self) -> serde_json::Value {
        let assigned_driver = self.assigned_driver_id.map(|id| {
            serde_json::json!({
                "id": id,
                "name": self.assigned_driver_name,
                "phone": self.assigned_driver_phone,
                "verified": self.assigned_driver_verified.unwrap_or(false),
            })
        });
        serde_json::json!({
            "id": self.id,
            "registrationNumber": self.registration_number,
            "vehicleType": self.vehicle_type,
            "model": self.model,
            "status": self.status,
            "assignedDriver": assigned_driver,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
        })
    }
}
