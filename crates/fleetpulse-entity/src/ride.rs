//! Ride entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A ride, with its driver's identity denormalized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RideRow {
    /// Unique ride identifier.
    pub id: Uuid,
    /// Service class: Ride, Food-Delivery, Courier-Delivery.
    pub service: String,
    /// Requesting customer's name.
    pub user_name: String,
    /// Assigned driver, if any.
    pub driver_id: Option<Uuid>,
    /// Assigned driver's name (joined).
    pub driver_name: Option<String>,
    /// Ride status: pending, in-progress, completed, cancelled.
    pub status: String,
    /// Fare amount.
    pub amount: f64,
    /// When the ride took place.
    pub ride_time: DateTime<Utc>,
    /// When the ride was created.
    pub created_at: DateTime<Utc>,
    /// When the ride was last modified.
    pub updated_at: DateTime<Utc>,
}

impl RideRow {
    /// Wire document with the driver nested.
    pub fn wire(&self) -> serde_json::Value {
        let driver = self.driver_id.map(|id| {
            serde_json::json!({ "id": id, "name": self.driver_name })
        });
        serde_json::json!({
            "id": self.id,
            "service": self.service,
            "userName": self.user_name,
            "driver": driver,
            "status": self.status,
            "amount": self.amount,
            "rideTime": self.ride_time,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
        })
    }
}
