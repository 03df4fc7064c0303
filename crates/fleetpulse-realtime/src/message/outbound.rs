//! Builders for server-to-observer frames.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use fleetpulse_core::events::ChangeEvent;

use super::envelope::Envelope;

/// Sent immediately on connect, before any client message.
pub fn connection_established(client_id: Uuid) -> Envelope {
    Envelope::new(
        "connection-established",
        serde_json::json!({
            "message": "Connection successful",
            "socketId": client_id,
            "timestamp": Utc::now(),
        }),
    )
}

/// Sent in response to `client-connected`.
pub fn server_welcome(client_id: Uuid) -> Envelope {
    Envelope::new(
        "server-welcome",
        serde_json::json!({
            "message": "Welcome to the fleet management system",
            "serverTime": Utc::now(),
            "clientId": client_id,
        }),
    )
}

/// Sent in response to `client-heartbeat`.
pub fn server_heartbeat() -> Envelope {
    Envelope::new(
        "server-heartbeat",
        serde_json::json!({
            "message": "Server is alive",
            "serverTime": Utc::now(),
        }),
    )
}

/// The `{success, data, timestamp, message?}` body carried by every
/// `${x}Update` broadcast. Built once per cycle so every recipient, and
/// every later cache seed, gets the identical payload.
pub fn success_payload(data: Value, message: Option<&str>) -> Value {
    let mut body = serde_json::json!({
        "success": true,
        "data": data,
        "timestamp": Utc::now(),
    });
    if let (Some(message), Some(obj)) = (message, body.as_object_mut()) {
        obj.insert("message".to_string(), Value::String(message.to_string()));
    }
    body
}

/// Advisory per-change frame, e.g. `vehicles:update`.
pub fn change_notice(event: &ChangeEvent) -> Envelope {
    Envelope::new(
        event.resource.change_event(event.op),
        serde_json::json!({
            "data": event.advisory_data(),
            "timestamp": event.occurred_at,
        }),
    )
}

/// Report failure frame, sent only to the requesting client.
pub fn report_error(message: &str) -> Envelope {
    Envelope::new("reportError", serde_json::json!({ "message": message }))
}

/// Generic error frame.
pub fn error(message: &str) -> Envelope {
    Envelope::new("error", serde_json::json!({ "message": message }))
}

/// Acknowledges a completed `refresh-data` request.
pub fn refresh_complete() -> Envelope {
    Envelope::new(
        "refresh-complete",
        serde_json::json!({
            "success": true,
            "message": "Data refreshed successfully",
            "timestamp": Utc::now(),
        }),
    )
}
