pub mod error;
pub mod config;
pub mod report;
pub mod gateway;
pub mod session;

pub use error::{AuditDeskError, Result};
pub use config::{
    AuditConfig, Dtype, RuleDefinition, SchemaField, Severity, RulePatch, SchemaFieldPatch,
    ConfigValidator, ValidationResult, load_config, save_config,
};
pub use report::{
    AuditReport, StoredReportMetadata, SampleRow, DerivedIssue, ErrorType, Indicator,
    derive_issue_log, derive_indicators, compare, ReportComparison,
};
pub use gateway::{DatasetUpload, Gateway, GatewayConfig, HttpGateway, MockGateway};
pub use session::{Console, ConsoleCommand, ConsoleResult, InteractiveConsole, SessionState};
