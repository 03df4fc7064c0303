//! Wire envelope: every frame is `{ "event": string, "data": value }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single wire frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name, e.g. `vehiclesUpdate` or `reportError`.
    pub event: String,
    /// Event payload.
    pub data: Value,
}

impl Envelope {
    /// Creates an envelope.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Serializes to the wire text frame.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
