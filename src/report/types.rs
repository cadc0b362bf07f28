use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use crate::config::{AuditConfig, Severity};
use super::sample::SampleRow;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub column_count: u64,
    #[serde(default)]
    pub engine_used: String,
    #[serde(default)]
    pub issues_found: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStatus {
    #[default]
    Ok,
    Missing,
    TypeMismatch,
}

impl SchemaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaStatus::Ok => "ok",
            SchemaStatus::Missing => "missing",
            SchemaStatus::TypeMismatch => "type_mismatch",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaResult {
    pub field: String,
    #[serde(default)]
    pub status: SchemaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValueResult {
    pub column: String,
    #[serde(default)]
    pub missing_count: u64,
    #[serde(default)]
    pub missing_pct: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_rows: Vec<SampleRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub name: String,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub failing_rows: u64,
    /// Some engines echo the declared severity here; otherwise it is looked
    /// up in the echoed config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_rows: Vec<SampleRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub duplicate_count: u64,
    #[serde(default)]
    pub null_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_rows: Vec<SampleRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: ReportSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema_results: Vec<SchemaResult>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub missing_values: Vec<MissingValueResult>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rule_results: Vec<RuleResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_result: Option<PrimaryKeyResult>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_rows: Vec<SampleRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AuditConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl AuditReport {
    pub fn issues_found(&self) -> i64 {
        self.summary.issues_found
    }

    pub fn dataset_name(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.dataset_name.as_str())
    }

    pub fn rule_severity(&self, rule: &RuleResult) -> Severity {
        rule.severity
            .or_else(|| {
                self.config
                    .as_ref()
                    .and_then(|c| c.get_rule(&rule.name))
                    .map(|r| r.severity)
            })
            .unwrap_or_default()
    }

    pub fn primary_key_columns(&self) -> Vec<String> {
        match &self.primary_key_result {
            Some(pk) if !pk.columns.is_empty() => pk.columns.clone(),
            _ => self
                .config
                .as_ref()
                .map(|c| c.primary_key_columns().to_vec())
                .unwrap_or_default(),
        }
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = &RuleResult> {
        self.rule_results.iter().filter(|r| !r.passed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReportMetadata {
    pub id: String,
    #[serde(default)]
    pub dataset_name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub issues_found: i64,
}

impl StoredReportMetadata {
    /// `created_at` reformatted as `YYYY-MM-DD HH:MM`; the raw text when it is
    /// neither RFC 3339 nor a naive ISO timestamp.
    pub fn created_at_display(&self) -> String {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.created_at) {
            return dt.format("%Y-%m-%d %H:%M").to_string();
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f") {
            return dt.format("%Y-%m-%d %H:%M").to_string();
        }
        self.created_at.clone()
    }
}
