//! Messages sent by observers to the server.

use serde::Deserialize;

use fleetpulse_core::report::RawReportParams;

/// Inbound frames, tagged by `event` with the payload under `data`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundMessage {
    /// Join a broadcast room by name.
    #[serde(rename = "join-room")]
    JoinRoom(String),
    /// Leave a broadcast room by name.
    #[serde(rename = "leave-room")]
    LeaveRoom(String),
    /// Client-side connection confirmation; triggers the welcome message
    /// and the full initial data push.
    #[serde(rename = "client-connected")]
    ClientConnected(Option<serde_json::Value>),
    /// Keepalive; answered with `server-heartbeat`.
    #[serde(rename = "client-heartbeat")]
    ClientHeartbeat(Option<serde_json::Value>),
    /// Request a fresh broadcast of one collection.
    #[serde(rename = "getLatestData")]
    GetLatestData(GetLatestData),
    /// Request a fresh broadcast of several (or all) collections.
    #[serde(rename = "refresh-data")]
    RefreshData(Option<RefreshData>),
    /// Request a personalized earnings report.
    #[serde(rename = "requestEarningsReport")]
    RequestEarningsReport(Option<RawReportParams>),
    /// Request a personalized driver performance report.
    #[serde(rename = "requestDriverPerformance")]
    RequestDriverPerformance(Option<RawReportParams>),
    /// Request a personalized rides analysis report.
    #[serde(rename = "requestRidesAnalysis")]
    RequestRidesAnalysis(Option<RawReportParams>),
    /// Request a personalized headline summary.
    #[serde(rename = "requestReportsSummary")]
    RequestReportsSummary(Option<RawReportParams>),
}

/// Payload of `getLatestData`.
#[derive(Debug, Clone, Deserialize)]
pub struct GetLatestData {
    /// Collection name.
    pub model: String,
}

/// Payload of `refresh-data`. A missing model list means all collections.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshData {
    /// Collection names to refresh.
    #[serde(default)]
    pub models: Option<Vec<String>>,
}

impl InboundMessage {
    /// Parses a wire text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_room() {
        let msg = InboundMessage::parse(r#"{"event":"join-room","data":"vehicles"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::JoinRoom(room) if room == "vehicles"));
    }

    #[test]
    fn test_parse_heartbeat_without_data() {
        let msg = InboundMessage::parse(r#"{"event":"client-heartbeat"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::ClientHeartbeat(None)));
    }

    #[test]
    fn test_parse_report_request_with_params() {
        let msg = InboundMessage::parse(
            r#"{"event":"requestEarningsReport","data":{"timeRange":"month","driverFilter":"all"}}"#,
        )
        .unwrap();
        match msg {
            InboundMessage::RequestEarningsReport(Some(params)) => {
                assert_eq!(params.time_range.as_deref(), Some("month"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_refresh_data_defaults_to_all() {
        let msg = InboundMessage::parse(r#"{"event":"refresh-data"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::RefreshData(None)));
    }

    #[test]
    fn test_parse_rejects_unknown_event() {
        assert!(InboundMessage::parse(r#"{"event":"dropTables"}"#).is_err());
        assert!(InboundMessage::parse("not json").is_err());
    }
}
