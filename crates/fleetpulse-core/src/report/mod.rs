//! Report filters, payload shapes, and delta policy.

pub mod delta;
pub mod filters;
pub mod payload;

pub use delta::ChangePolicy;
pub use filters::{DriverFilter, RawReportParams, ReportFilters, TimeRange};
