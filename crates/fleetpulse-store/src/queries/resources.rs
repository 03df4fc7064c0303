//! Canonical per-collection snapshot queries.
//!
//! Each query carries the collection's canonical sort and any joins the
//! wire document needs. These are the queries every broadcast cycle runs,
//! so they stay flat and index-friendly.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::resource::ResourceKind;
use fleetpulse_core::result::AppResult;
use fleetpulse_entity::{AdminRow, ComplaintRow, DriverRow, RideRow, VehicleRow};

/// Most recent rides included in the rides snapshot.
const RIDES_SNAPSHOT_LIMIT: i64 = 50;

/// Vehicles with their assigned driver, most recently modified first.
pub async fn list_vehicles(pool: &PgPool) -> AppResult<Vec<VehicleRow>> {
    sqlx::query_as::<_, VehicleRow>(
        "SELECT v.id, v.registration_number, v.vehicle_type, v.model, v.status, \
                v.assigned_driver_id, \
                d.name AS assigned_driver_name, \
                d.phone AS assigned_driver_phone, \
                (d.kyc_status = 'Verified') AS assigned_driver_verified, \
                v.created_at, v.updated_at \
         FROM vehicles v \
         LEFT JOIN drivers d ON d.id = v.assigned_driver_id \
         ORDER BY v.updated_at DESC",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list vehicles", e))
}

/// Drivers, most recently updated first.
pub async fn list_drivers(pool: &PgPool) -> AppResult<Vec<DriverRow>> {
    sqlx::query_as::<_, DriverRow>(
        "SELECT id, name, email, phone, vehicle, license_plate, kyc_status, \
                is_online, rating, joined_at, last_update \
         FROM drivers \
         ORDER BY last_update DESC",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list drivers", e))
}

/// Most recent rides with their driver, newest first.
pub async fn list_rides(pool: &PgPool) -> AppResult<Vec<RideRow>> {
    sqlx::query_as::<_, RideRow>(
        "SELECT r.id, r.service, r.user_name, r.driver_id, \
                d.name AS driver_name, \
                r.status, r.amount, r.ride_time, r.created_at, r.updated_at \
         FROM rides r \
         LEFT JOIN drivers d ON d.id = r.driver_id \
         ORDER BY r.created_at DESC \
         LIMIT $1",
    )
    .bind(RIDES_SNAPSHOT_LIMIT)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list rides", e))
}

/// Admin accounts, most recently modified first.
pub async fn list_admins(pool: &PgPool) -> AppResult<Vec<AdminRow>> {
    sqlx::query_as::<_, AdminRow>(
        "SELECT id, name, email, role, created_at, updated_at \
         FROM admins \
         ORDER BY updated_at DESC",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list admins", e))
}

/// Complaints with their vehicle and driver references, newest first.
pub async fn list_complaints(pool: &PgPool) -> AppResult<Vec<ComplaintRow>> {
    sqlx::query_as::<_, ComplaintRow>(
        "SELECT c.id, c.customer_name, c.customer_phone, c.vehicle_id, \
                v.registration_number AS vehicle_registration, \
                c.driver_id, d.name AS driver_name, d.phone AS driver_phone, \
                c.description, c.status, c.resolution_notes, \
                c.created_at, c.updated_at \
         FROM complaints c \
         LEFT JOIN vehicles v ON v.id = c.vehicle_id \
         LEFT JOIN drivers d ON d.id = c.driver_id \
         ORDER BY c.created_at DESC",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list complaints", e))
}

/// Most recent modification timestamp for a collection, for the polling
/// fallback. `None` when the collection is empty.
pub async fn latest_modified(
    pool: &PgPool,
    kind: ResourceKind,
) -> AppResult<Option<DateTime<Utc>>> {
    let query = match kind {
        ResourceKind::Vehicles => "SELECT MAX(updated_at) FROM vehicles",
        ResourceKind::Drivers => "SELECT MAX(last_update) FROM drivers",
        ResourceKind::Rides => "SELECT MAX(updated_at) FROM rides",
        ResourceKind::Admins => "SELECT MAX(updated_at) FROM admins",
        ResourceKind::Complaints => "SELECT MAX(updated_at) FROM complaints",
    };

    sqlx::query_scalar::<_, Option<DateTime<Utc>>>(query)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to check latest {kind} modification"),
                e,
            )
        })
}
