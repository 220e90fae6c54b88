pub mod types;

pub use types::{Citation, ComplianceStatus, Issue, Report, ReportSummary, Severity};
