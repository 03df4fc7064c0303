//! Resource kinds, report kinds, rooms, and change operations.
//!
//! Every kind maps to one canonical query, one broadcast room, and one pair
//! of wire event names. Keeping the mapping here means the store, realtime,
//! and API crates never hand-roll event-name strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A watched fleet collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Fleet vehicles (joined with their assigned driver).
    Vehicles,
    /// Drivers.
    Drivers,
    /// Rides (most recent 50).
    Rides,
    /// Admin accounts.
    Admins,
    /// Customer complaints (joined with vehicle and driver).
    Complaints,
}

impl ResourceKind {
    /// All watched resource kinds, in broadcast order.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Vehicles,
        ResourceKind::Drivers,
        ResourceKind::Rides,
        ResourceKind::Admins,
        ResourceKind::Complaints,
    ];

    /// Lowercase collection name (also the room name).
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vehicles => "vehicles",
            ResourceKind::Drivers => "drivers",
            ResourceKind::Rides => "rides",
            ResourceKind::Admins => "admins",
            ResourceKind::Complaints => "complaints",
        }
    }

    /// Parses a collection name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vehicles" => Some(ResourceKind::Vehicles),
            "drivers" => Some(ResourceKind::Drivers),
            "rides" => Some(ResourceKind::Rides),
            "admins" => Some(ResourceKind::Admins),
            "complaints" => Some(ResourceKind::Complaints),
            _ => None,
        }
    }

    /// Coalesced full-snapshot event name, e.g. `vehiclesUpdate`.
    pub fn update_event(&self) -> &'static str {
        match self {
            ResourceKind::Vehicles => "vehiclesUpdate",
            ResourceKind::Drivers => "driversUpdate",
            ResourceKind::Rides => "ridesUpdate",
            ResourceKind::Admins => "adminsUpdate",
            ResourceKind::Complaints => "complaintsUpdate",
        }
    }

    /// Advisory per-change event name, e.g. `vehicles:update`.
    pub fn change_event(&self, op: ChangeOp) -> String {
        format!("{}:{}", self.as_str(), op.as_str())
    }

    /// Whether a change to this kind also invalidates the dashboard stats.
    pub fn affects_dashboard(&self) -> bool {
        matches!(
            self,
            ResourceKind::Vehicles | ResourceKind::Drivers | ResourceKind::Rides
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of mutation observed on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// A new document was inserted.
    Insert,
    /// An existing document was updated in place.
    Update,
    /// An existing document was fully replaced.
    Replace,
    /// A document was deleted.
    Delete,
}

impl ChangeOp {
    /// Lowercase operation name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Insert => "insert",
            ChangeOp::Update => "update",
            ChangeOp::Replace => "replace",
            ChangeOp::Delete => "delete",
        }
    }

    /// Parses an operation name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(ChangeOp::Insert),
            "update" => Some(ChangeOp::Update),
            "replace" => Some(ChangeOp::Replace),
            "delete" => Some(ChangeOp::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameterized analytical report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    /// Earnings time series with summary totals.
    Earnings,
    /// Per-driver performance table and pie chart.
    DriverPerformance,
    /// Ride volume/status analysis.
    RidesAnalysis,
    /// Headline summary with period-over-period deltas.
    ReportsSummary,
}

impl ReportKind {
    /// All report kinds.
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Earnings,
        ReportKind::DriverPerformance,
        ReportKind::RidesAnalysis,
        ReportKind::ReportsSummary,
    ];

    /// Inbound request event name, e.g. `requestEarningsReport`.
    pub fn request_event(&self) -> &'static str {
        match self {
            ReportKind::Earnings => "requestEarningsReport",
            ReportKind::DriverPerformance => "requestDriverPerformance",
            ReportKind::RidesAnalysis => "requestRidesAnalysis",
            ReportKind::ReportsSummary => "requestReportsSummary",
        }
    }

    /// Direct-reply event name, e.g. `earningsReportData`.
    pub fn data_event(&self) -> &'static str {
        match self {
            ReportKind::Earnings => "earningsReportData",
            ReportKind::DriverPerformance => "driverPerformanceData",
            ReportKind::RidesAnalysis => "ridesAnalysisData",
            ReportKind::ReportsSummary => "reportsSummaryData",
        }
    }

    /// Periodic push event name, e.g. `earningsReportUpdate`.
    pub fn update_event(&self) -> &'static str {
        match self {
            ReportKind::Earnings => "earningsReportUpdate",
            ReportKind::DriverPerformance => "driverPerformanceUpdate",
            ReportKind::RidesAnalysis => "ridesAnalysisUpdate",
            ReportKind::ReportsSummary => "reportsSummaryUpdate",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Earnings => f.write_str("earnings"),
            ReportKind::DriverPerformance => f.write_str("driverPerformance"),
            ReportKind::RidesAnalysis => f.write_str("ridesAnalysis"),
            ReportKind::ReportsSummary => f.write_str("reportsSummary"),
        }
    }
}

/// A broadcast room an observer can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Default room, joined automatically at connect. Receives dashboard stats.
    Dashboard,
    /// Per-collection room receiving `${x}Update` broadcasts.
    Resource(ResourceKind),
    /// Room for clients on the reports/analytics views.
    Reports,
}

impl Room {
    /// Parses a room name. `admin-management` is a legacy alias for the
    /// admins room kept for older dashboard builds.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dashboard" => Some(Room::Dashboard),
            "reports" => Some(Room::Reports),
            "admin-management" => Some(Room::Resource(ResourceKind::Admins)),
            other => ResourceKind::parse(other).map(Room::Resource),
        }
    }

    /// Canonical room name.
    pub fn name(&self) -> &'static str {
        match self {
            Room::Dashboard => "dashboard",
            Room::Reports => "reports",
            Room::Resource(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::parse("invoices"), None);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ResourceKind::Vehicles.update_event(), "vehiclesUpdate");
        assert_eq!(
            ResourceKind::Drivers.change_event(ChangeOp::Delete),
            "drivers:delete"
        );
        assert_eq!(ReportKind::Earnings.data_event(), "earningsReportData");
        assert_eq!(
            ReportKind::ReportsSummary.update_event(),
            "reportsSummaryUpdate"
        );
    }

    #[test]
    fn test_room_parse() {
        assert_eq!(Room::parse("dashboard"), Some(Room::Dashboard));
        assert_eq!(
            Room::parse("vehicles"),
            Some(Room::Resource(ResourceKind::Vehicles))
        );
        assert_eq!(
            Room::parse("admin-management"),
            Some(Room::Resource(ResourceKind::Admins))
        );
        assert_eq!(Room::parse("billing"), None);
    }
}
