use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use crate::error::{AuditDeskError, Result};
use super::types::AuditReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountDelta {
    pub name: String,
    pub count_a: u64,
    pub count_b: u64,
    pub delta: i64,
}

impl CountDelta {
    fn new(name: &str, count_a: u64, count_b: u64) -> Self {
        Self {
            name: name.to_string(),
            count_a,
            count_b,
            delta: count_b as i64 - count_a as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportComparison {
    pub report_a: String,
    pub report_b: String,
    pub issues_a: i64,
    pub issues_b: i64,
    /// `issues_b - issues_a`.
    pub delta: i64,
    pub rule_deltas: Vec<CountDelta>,
    pub column_deltas: Vec<CountDelta>,
    #[serde(skip)]
    config_a: String,
    #[serde(skip)]
    config_b: String,
}

impl ReportComparison {
    pub fn has_config_changes(&self) -> bool {
        self.config_a != self.config_b
    }

    /// Line diff of the two echoed configs rendered as YAML.
    pub fn config_diff(&self) -> String {
        let diff = TextDiff::from_lines(&self.config_a, &self.config_b);
        let mut output = String::new();

        for change in diff.iter_all_changes() {
            let line = change.to_string();
            let formatted = match change.tag() {
                ChangeTag::Delete => format!("- {}", line.trim_end()).red().to_string(),
                ChangeTag::Insert => format!("+ {}", line.trim_end()).green().to_string(),
                ChangeTag::Equal => format!("  {}", line.trim_end()),
            };
            output.push_str(&formatted);
            output.push('\n');
        }

        output
    }

    pub fn changed_rules(&self) -> impl Iterator<Item = &CountDelta> {
        self.rule_deltas.iter().filter(|d| d.delta != 0)
    }

    pub fn changed_columns(&self) -> impl Iterator<Item = &CountDelta> {
        self.column_deltas.iter().filter(|d| d.delta != 0)
    }
}

pub fn compare(report_a: Option<&AuditReport>, report_b: Option<&AuditReport>) -> Result<ReportComparison> {
    let (a, b) = match (report_a, report_b) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(AuditDeskError::Validation("select two reports to compare".to_string())),
    };

    if a.id == b.id {
        return Err(AuditDeskError::Validation(format!(
            "cannot compare report '{}' with itself",
            a.id
        )));
    }

    let rule_deltas = union_deltas(
        a.rule_results.iter().map(|r| (r.name.as_str(), r.failing_rows)),
        b.rule_results.iter().map(|r| (r.name.as_str(), r.failing_rows)),
    );
    let column_deltas = union_deltas(
        a.missing_values.iter().map(|m| (m.column.as_str(), m.missing_count)),
        b.missing_values.iter().map(|m| (m.column.as_str(), m.missing_count)),
    );

    Ok(ReportComparison {
        report_a: a.id.clone(),
        report_b: b.id.clone(),
        issues_a: a.issues_found(),
        issues_b: b.issues_found(),
        delta: b.issues_found() - a.issues_found(),
        rule_deltas,
        column_deltas,
        config_a: render_config(a),
        config_b: render_config(b),
    })
}

/// Names from A in order, then names only in B. Absent counts are zero.
fn union_deltas<'a>(
    a: impl Iterator<Item = (&'a str, u64)>,
    b: impl Iterator<Item = (&'a str, u64)>,
) -> Vec<CountDelta> {
    let a: Vec<_> = a.collect();
    let b: Vec<_> = b.collect();
    fn lookup(items: &[(&str, u64)], name: &str) -> u64 {
        items.iter().find(|(n, _)| *n == name).map(|(_, c)| *c).unwrap_or(0)
    }

    let mut deltas: Vec<CountDelta> = Vec::new();
    for (name, _) in a.iter().chain(b.iter()) {
        if deltas.iter().any(|d| d.name == *name) {
            continue;
        }
        deltas.push(CountDelta::new(name, lookup(&a, name), lookup(&b, name)));
    }
    deltas
}

fn render_config(report: &AuditReport) -> String {
    report
        .config
        .as_ref()
        .and_then(|c| serde_yaml::to_string(c).ok())
        .unwrap_or_default()
}
