//! # fleetpulse-entity
//!
//! Row models for the fleet collections. Each row is the denormalized
//! result of its collection's canonical query (joins included) and knows
//! how to shape itself into the wire document dashboards consume.

pub mod admin;
pub mod complaint;
pub mod driver;
pub mod ride;
pub mod vehicle;

pub use admin::AdminRow;
pub use complaint::ComplaintRow;
pub use driver::DriverRow;
pub use ride::RideRow;
pub use vehicle::VehicleRow;
