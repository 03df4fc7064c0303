//! # fleetpulse-api
//!
//! Axum HTTP/WebSocket surface for FleetPulse: the WebSocket upgrade into
//! the real-time engine, read-only snapshot and report endpoints backed by
//! the same provider the engines use, and a health endpoint.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
