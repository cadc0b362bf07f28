use std::cmp::Ordering;
use serde::Serialize;
use tabled::Tabled;
use crate::config::Severity;
use super::types::{AuditReport, SchemaStatus};

/// Missing-value percentages strictly above this are errors, otherwise warnings.
pub const MISSING_PCT_ERROR_THRESHOLD: f64 = 10.0;

pub const MISSING_VALUE_RENDERING: &str = "NULL / Empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorType {
    #[serde(rename = "Rule Failed")]
    RuleFailed,
    #[serde(rename = "Missing Value")]
    MissingValue,
    #[serde(rename = "PK Null")]
    PkNull,
    #[serde(rename = "PK Duplicate")]
    PkDuplicate,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::RuleFailed => "Rule Failed",
            ErrorType::MissingValue => "Missing Value",
            ErrorType::PkNull => "PK Null",
            ErrorType::PkDuplicate => "PK Duplicate",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedIssue {
    pub row_id: String,
    pub value: String,
    pub error_type: ErrorType,
    pub rule_or_column: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub label: String,
    pub detail: String,
    pub severity: Severity,
}

impl Indicator {
    fn new(label: &str, detail: String, severity: Severity) -> Self {
        Self {
            label: label.to_string(),
            detail,
            severity,
        }
    }
}

pub fn missing_severity(missing_pct: f64) -> Severity {
    if missing_pct > MISSING_PCT_ERROR_THRESHOLD {
        Severity::Error
    } else {
        Severity::Warning
    }
}

pub fn derive_issue_log(report: &AuditReport) -> Vec<DerivedIssue> {
    let mut issues = Vec::new();

    for rule in report.failed_rules() {
        let severity = report.rule_severity(rule);
        for row in &rule.sample_rows {
            issues.push(DerivedIssue {
                row_id: row.row_id(),
                value: row.render(),
                error_type: ErrorType::RuleFailed,
                rule_or_column: rule.name.clone(),
                severity,
            });
        }
    }

    for missing in report.missing_values.iter().filter(|m| m.missing_count > 0) {
        let severity = missing_severity(missing.missing_pct);
        for row in &missing.sample_rows {
            issues.push(DerivedIssue {
                row_id: row.row_id(),
                value: MISSING_VALUE_RENDERING.to_string(),
                error_type: ErrorType::MissingValue,
                rule_or_column: missing.column.clone(),
                severity,
            });
        }
    }

    if let Some(pk) = &report.primary_key_result {
        let columns = report.primary_key_columns();
        let label = columns.join(", ");
        for row in &pk.sample_rows {
            // The engine does not tag why a row was sampled; a blank key
            // column is read as a null violation, anything else as a duplicate.
            let error_type = if columns.iter().any(|c| row.is_blank(c)) {
                ErrorType::PkNull
            } else {
                ErrorType::PkDuplicate
            };
            issues.push(DerivedIssue {
                row_id: row.row_id(),
                value: row.render(),
                error_type,
                rule_or_column: label.clone(),
                severity: Severity::Error,
            });
        }
    }

    stable_sort_by(&mut issues, |a, b| compare_row_ids(&a.row_id, &b.row_id));
    issues
}

/// Numeric when both ids are base-10 integers of any width, lexicographic
/// otherwise.
pub fn compare_row_ids(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some((neg_a, mag_a)), Some((neg_b, mag_b))) => match (neg_a, neg_b) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => compare_magnitudes(mag_a, mag_b),
            (true, true) => compare_magnitudes(mag_b, mag_a),
        },
        _ => a.cmp(b),
    }
}

fn integer_key(id: &str) -> Option<(bool, &str)> {
    let id = id.trim();
    let (negative, digits) = match id.as_bytes().first()? {
        b'-' => (true, &id[1..]),
        b'+' => (false, &id[1..]),
        _ => (false, id),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = digits.trim_start_matches('0');
    if magnitude.is_empty() {
        return Some((false, "0"));
    }
    Some((negative, magnitude))
}

fn compare_magnitudes(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Merge sort that keeps emission order on ties.
///
/// Mixing numeric and text ids makes `compare_row_ids` non-transitive
/// (`"9" < "10" < "1a" < "9"`), and `slice::sort_by` may panic on such a
/// comparator, so merging is done here.
fn stable_sort_by<T, F>(items: &mut Vec<T>, mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    fn merge_sort<T, F>(items: Vec<T>, compare: &mut F) -> Vec<T>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if items.len() <= 1 {
            return items;
        }
        let mut left = items;
        let right = left.split_off(left.len() / 2);
        let left = merge_sort(left, compare);
        let right = merge_sort(right, compare);

        let mut merged = Vec::with_capacity(left.len() + right.len());
        let mut left = left.into_iter().peekable();
        let mut right = right.into_iter().peekable();
        loop {
            let take_right = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) => compare(r, l) == Ordering::Less,
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (None, None) => break,
            };
            let next = if take_right { right.next() } else { left.next() };
            merged.extend(next);
        }
        merged
    }

    let taken = std::mem::take(items);
    *items = merge_sort(taken, &mut compare);
}

pub fn derive_indicators(report: &AuditReport) -> Vec<Indicator> {
    let mut indicators = Vec::new();

    for result in &report.schema_results {
        match result.status {
            SchemaStatus::Missing => {
                indicators.push(Indicator::new("Missing column", result.field.clone(), Severity::Error));
            }
            SchemaStatus::TypeMismatch => {
                let expected = result
                    .expected
                    .clone()
                    .or_else(|| {
                        report
                            .config
                            .as_ref()
                            .and_then(|c| c.get_field(&result.field))
                            .map(|f| f.dtype.to_string())
                    })
                    .unwrap_or_else(|| "n/a".to_string());
                let actual = result.actual.as_deref().unwrap_or("n/a");
                indicators.push(Indicator::new(
                    "Type mismatch",
                    format!("{}: expected {}, found {}", result.field, expected, actual),
                    Severity::Warning,
                ));
            }
            SchemaStatus::Ok => {}
        }
    }

    for missing in report.missing_values.iter().filter(|m| m.missing_count > 0) {
        indicators.push(Indicator::new(
            "Missing data",
            format!("{}: {:.1}%", missing.column, missing.missing_pct),
            missing_severity(missing.missing_pct),
        ));
    }

    for rule in report.failed_rules() {
        indicators.push(Indicator::new(
            "Rule failed",
            format!("{} ({} rows)", rule.name, rule.failing_rows),
            report.rule_severity(rule),
        ));
    }

    if let Some(pk) = &report.primary_key_result {
        if pk.duplicate_count > 0 {
            indicators.push(Indicator::new("PK duplicate", format!("{} rows", pk.duplicate_count), Severity::Error));
        }
        if pk.null_count > 0 {
            indicators.push(Indicator::new("PK null", format!("{} rows", pk.null_count), Severity::Error));
        }
    }

    indicators
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl IssueCounts {
    pub fn from_severities(severities: impl IntoIterator<Item = Severity>) -> Self {
        let mut counts = Self::default();
        for severity in severities {
            match severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.infos += 1,
            }
        }
        counts
    }

    pub fn of_issues(issues: &[DerivedIssue]) -> Self {
        Self::from_severities(issues.iter().map(|i| i.severity))
    }

    pub fn of_indicators(indicators: &[Indicator]) -> Self {
        Self::from_severities(indicators.iter().map(|i| i.severity))
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

pub fn filter_by_severity(issues: &[DerivedIssue], min: Severity) -> Vec<DerivedIssue> {
    issues.iter().filter(|i| i.severity >= min).cloned().collect()
}

#[derive(Debug, Clone, Tabled)]
pub struct IssueRow {
    #[tabled(rename = "Row")]
    pub row_id: String,
    #[tabled(rename = "Type")]
    pub error_type: String,
    #[tabled(rename = "Rule / Column")]
    pub rule_or_column: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl From<&DerivedIssue> for IssueRow {
    fn from(issue: &DerivedIssue) -> Self {
        IssueRow {
            row_id: issue.row_id.clone(),
            error_type: issue.error_type.to_string(),
            rule_or_column: issue.rule_or_column.clone(),
            severity: issue.severity.to_string(),
            value: truncate_value(&issue.value, 60),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct IndicatorRow {
    #[tabled(rename = "Indicator")]
    pub label: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
}

impl From<&Indicator> for IndicatorRow {
    fn from(indicator: &Indicator) -> Self {
        IndicatorRow {
            label: indicator.label.clone(),
            detail: indicator.detail.clone(),
            severity: indicator.severity.to_string(),
        }
    }
}

fn truncate_value(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let head: String = value.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{MissingValueResult, PrimaryKeyResult, RuleResult, SampleRow, SchemaResult, LINE_KEY};

    fn row(line: &str) -> SampleRow {
        SampleRow::new().with(LINE_KEY, line)
    }

    fn issue(row_id: &str, rule: &str) -> DerivedIssue {
        DerivedIssue {
            row_id: row_id.to_string(),
            value: String::new(),
            error_type: ErrorType::RuleFailed,
            rule_or_column: rule.to_string(),
            severity: Severity::Warning,
        }
    }

    #[test]
    fn test_empty_report() {
        let report = AuditReport::default();
        assert!(derive_issue_log(&report).is_empty());
        assert!(derive_indicators(&report).is_empty());
    }

    #[test]
    fn test_compare_row_ids() {
        assert_eq!(compare_row_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_row_ids("10", "9"), Ordering::Greater);
        assert_eq!(compare_row_ids("10", "n/a"), Ordering::Less);
        assert_eq!(compare_row_ids("abc", "abd"), Ordering::Less);
        assert_eq!(compare_row_ids("007", "7"), Ordering::Equal);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut issues = vec![issue("3", "a"), issue("1", "b"), issue("3", "c"), issue("1", "d")];
        stable_sort_by(&mut issues, |a, b| compare_row_ids(&a.row_id, &b.row_id));
        let order: Vec<_> = issues.iter().map(|i| i.rule_or_column.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_sort_tolerates_non_transitive_ids() {
        let mut issues = vec![issue("1a", "x"), issue("10", "y"), issue("9", "z")];
        stable_sort_by(&mut issues, |a, b| compare_row_ids(&a.row_id, &b.row_id));
        let ids: Vec<_> = issues.iter().map(|i| i.row_id.as_str()).collect();
        assert_eq!(ids, vec!["1a", "9", "10"]);
    }

    #[test]
    fn test_compare_wide_integer_ids() {
        assert_eq!(compare_row_ids("99", "100000000000000000000"), Ordering::Less);
        assert_eq!(compare_row_ids("100000000000000000000", "99999999999999999999"), Ordering::Greater);
        assert_eq!(compare_row_ids("-100000000000000000000", "-5"), Ordering::Less);
        assert_eq!(compare_row_ids("-3", "2"), Ordering::Less);
        assert_eq!(compare_row_ids("-0", "000"), Ordering::Equal);
        assert_eq!(compare_row_ids("-", "1"), "-".cmp("1"));

        let mut issues = vec![issue("100000000000000000000", "a"), issue("99", "b")];
        stable_sort_by(&mut issues, |a, b| compare_row_ids(&a.row_id, &b.row_id));
        let ids: Vec<_> = issues.iter().map(|i| i.row_id.as_str()).collect();
        assert_eq!(ids, vec!["99", "100000000000000000000"]);
    }

    #[test]
    fn test_missing_severity_threshold() {
        assert_eq!(missing_severity(15.0), Severity::Error);
        assert_eq!(missing_severity(10.0), Severity::Warning);
        assert_eq!(missing_severity(5.0), Severity::Warning);
    }

    #[test]
    fn test_missing_value_issue_rendering() {
        let report = AuditReport {
            missing_values: vec![MissingValueResult {
                column: "email".to_string(),
                missing_count: 3,
                missing_pct: 15.0,
                sample_rows: vec![row("4").with("email", "")],
            }],
            ..Default::default()
        };
        let issues = derive_issue_log(&report);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].value, "NULL / Empty");
        assert_eq!(issues[0].error_type, ErrorType::MissingValue);
        assert_eq!(issues[0].severity, Severity::Error);

        let indicators = derive_indicators(&report);
        assert_eq!(indicators[0].detail, "email: 15.0%");
        assert_eq!(indicators[0].severity, Severity::Error);
    }

    #[test]
    fn test_zero_missing_count_ignored() {
        let report = AuditReport {
            missing_values: vec![MissingValueResult {
                column: "email".to_string(),
                missing_count: 0,
                missing_pct: 0.0,
                sample_rows: vec![row("4")],
            }],
            ..Default::default()
        };
        assert!(derive_issue_log(&report).is_empty());
        assert!(derive_indicators(&report).is_empty());
    }

    #[test]
    fn test_failed_rule_without_samples() {
        let report = AuditReport {
            rule_results: vec![RuleResult {
                name: "qty_positive".to_string(),
                passed: false,
                failing_rows: 12,
                severity: Some(Severity::Error),
                sample_rows: Vec::new(),
            }],
            ..Default::default()
        };
        assert!(derive_issue_log(&report).is_empty());
        let indicators = derive_indicators(&report);
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].label, "Rule failed");
        assert_eq!(indicators[0].detail, "qty_positive (12 rows)");
        assert_eq!(indicators[0].severity, Severity::Error);
    }

    #[test]
    fn test_passed_rule_ignored() {
        let report = AuditReport {
            rule_results: vec![RuleResult {
                name: "ok".to_string(),
                passed: true,
                sample_rows: vec![row("1")],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(derive_issue_log(&report).is_empty());
        assert!(derive_indicators(&report).is_empty());
    }

    #[test]
    fn test_rule_issue_uses_line_and_full_rendering() {
        let report = AuditReport {
            rule_results: vec![RuleResult {
                name: "qty_positive".to_string(),
                passed: false,
                failing_rows: 2,
                severity: Some(Severity::Info),
                sample_rows: vec![row("2").with("qty", "-1"), SampleRow::new().with("qty", "-5")],
            }],
            ..Default::default()
        };
        let issues = derive_issue_log(&report);
        assert_eq!(issues[0].row_id, "2");
        assert_eq!(issues[0].value, r#"{"__line__":"2","qty":"-1"}"#);
        assert_eq!(issues[1].row_id, "n/a");
        assert_eq!(issues[1].severity, Severity::Info);
    }

    #[test]
    fn test_pk_classification() {
        let report = AuditReport {
            primary_key_result: Some(PrimaryKeyResult {
                columns: vec!["id".to_string(), "line".to_string()],
                duplicate_count: 2,
                null_count: 1,
                sample_rows: vec![
                    row("5").with("id", "1").with("line", "1"),
                    row("6").with("id", "").with("line", "2"),
                    row("7").with("line", "3"),
                ],
            }),
            ..Default::default()
        };
        let issues = derive_issue_log(&report);
        assert_eq!(issues[0].error_type, ErrorType::PkDuplicate);
        assert_eq!(issues[1].error_type, ErrorType::PkNull);
        assert_eq!(issues[2].error_type, ErrorType::PkNull);
        assert!(issues.iter().all(|i| i.rule_or_column == "id, line"));
        assert!(issues.iter().all(|i| i.severity == Severity::Error));

        let indicators = derive_indicators(&report);
        assert_eq!(indicators.len(), 2);
        assert_eq!(indicators[0].label, "PK duplicate");
        assert_eq!(indicators[0].detail, "2 rows");
        assert_eq!(indicators[1].label, "PK null");
        assert_eq!(indicators[1].detail, "1 rows");
    }

    #[test]
    fn test_schema_indicators() {
        let report = AuditReport {
            schema_results: vec![
                SchemaResult { field: "id".to_string(), status: SchemaStatus::Ok, ..Default::default() },
                SchemaResult { field: "email".to_string(), status: SchemaStatus::Missing, ..Default::default() },
                SchemaResult {
                    field: "age".to_string(),
                    status: SchemaStatus::TypeMismatch,
                    expected: Some("integer".to_string()),
                    actual: None,
                },
            ],
            ..Default::default()
        };
        let indicators = derive_indicators(&report);
        assert_eq!(indicators.len(), 2);
        assert_eq!(indicators[0].label, "Missing column");
        assert_eq!(indicators[0].detail, "email");
        assert_eq!(indicators[0].severity, Severity::Error);
        assert_eq!(indicators[1].detail, "age: expected integer, found n/a");
        assert_eq!(indicators[1].severity, Severity::Warning);
    }

    #[test]
    fn test_issue_counts_and_filter() {
        let mut a = issue("1", "a");
        a.severity = Severity::Error;
        let mut b = issue("2", "b");
        b.severity = Severity::Info;
        let issues = vec![a, b, issue("3", "c")];

        let counts = IssueCounts::of_issues(&issues);
        assert_eq!(counts, IssueCounts { errors: 1, warnings: 1, infos: 1 });
        assert_eq!(counts.total(), 3);
        assert!(counts.has_errors());

        let filtered = filter_by_severity(&issues, Severity::Warning);
        let ids: Vec<_> = filtered.iter().map(|i| i.row_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_issue_serializes_camel_case() {
        let json = serde_json::to_string(&issue("1", "r")).unwrap();
        assert!(json.contains("\"rowId\":\"1\""));
        assert!(json.contains("\"errorType\":\"Rule Failed\""));
        assert!(json.contains("\"ruleOrColumn\":\"r\""));
        assert!(json.contains("\"severity\":\"warning\""));
    }

    #[test]
    fn test_truncate_value() {
        assert_eq!(truncate_value("short", 10), "short");
        assert_eq!(truncate_value("abcdefghijkl", 8), "abcde...");
    }
}
