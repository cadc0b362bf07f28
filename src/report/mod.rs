mod types;
mod sample;
mod aggregate;
mod compare;

pub use types::{
    AuditReport, ReportSummary, SchemaResult, SchemaStatus, MissingValueResult,
    RuleResult, PrimaryKeyResult, StoredReportMetadata,
};
pub use sample::{SampleRow, LINE_KEY, UNKNOWN_ROW_ID};
pub use aggregate::{
    DerivedIssue, ErrorType, Indicator, IssueCounts, IssueRow, IndicatorRow,
    derive_issue_log, derive_indicators, compare_row_ids, filter_by_severity, missing_severity,
    MISSING_PCT_ERROR_THRESHOLD, MISSING_VALUE_RENDERING,
};
pub use compare::{compare, CountDelta, ReportComparison};
