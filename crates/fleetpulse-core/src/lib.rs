//! # fleetpulse-core
//!
//! Core crate for FleetPulse. Contains configuration schemas, the unified
//! error system, resource/report kind enums, change events, report filter
//! parsing and payload shapes, and the trait seams implemented by the
//! store crate.
//!
//! This crate has **no** internal dependencies on other FleetPulse crates.

pub mod config;
pub mod error;
pub mod events;
pub mod report;
pub mod resource;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
