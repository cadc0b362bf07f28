use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use crate::config::{AuditConfig, SchemaField, Severity, ValidationResult};
use crate::error::Result;
use crate::report::{
    derive_indicators, derive_issue_log, filter_by_severity, AuditReport, CountDelta,
    IndicatorRow, IssueCounts, IssueRow, ReportComparison, StoredReportMetadata,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Dataset")]
    dataset: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Issues")]
    issues: i64,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Nullable")]
    nullable: bool,
    #[tabled(rename = "Constraints")]
    constraints: String,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Expression")]
    expression: String,
}

#[derive(Tabled)]
struct DeltaRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "A")]
    count_a: u64,
    #[tabled(rename = "B")]
    count_b: u64,
    #[tabled(rename = "Delta")]
    delta: String,
}

impl From<&CountDelta> for DeltaRow {
    fn from(d: &CountDelta) -> Self {
        DeltaRow {
            name: d.name.clone(),
            count_a: d.count_a,
            count_b: d.count_b,
            delta: signed(d.delta),
        }
    }
}

fn markdown<T: Tabled>(rows: impl IntoIterator<Item = T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    table.to_string()
}

fn signed(n: i64) -> String {
    if n > 0 {
        format!("+{}", n)
    } else {
        n.to_string()
    }
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Error => severity.as_str().red().to_string(),
        Severity::Warning => severity.as_str().yellow().to_string(),
        Severity::Info => severity.as_str().to_string(),
    }
}

fn constraints(field: &SchemaField) -> String {
    let mut parts = Vec::new();
    if let Some(min) = field.min {
        parts.push(format!("min={}", min));
    }
    if let Some(max) = field.max {
        parts.push(format!("max={}", max));
    }
    if let Some(values) = &field.allowed_values {
        parts.push(format!("in [{}]", values.join(", ")));
    }
    if let Some(regex) = &field.regex {
        parts.push(format!("regex={}", regex));
    }
    parts.join("; ")
}

pub fn render_history(history: &[StoredReportMetadata], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(history)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(history)?),
        OutputFormat::Table => {
            if history.is_empty() {
                return Ok("No stored reports.".to_string());
            }
            Ok(markdown(history.iter().map(|m| HistoryRow {
                id: m.id.clone(),
                dataset: m.dataset_name.clone(),
                created: m.created_at_display(),
                issues: m.issues_found,
            })))
        }
    }
}

pub fn render_config(config: &AuditConfig) -> String {
    let mut out = String::new();
    let dataset = if config.dataset_name.is_empty() { "(unnamed)" } else { &config.dataset_name };
    out.push_str(&format!("Dataset: {}\n", dataset));
    match config.primary_key_columns() {
        [] => out.push_str("Primary key: (none)\n"),
        columns => out.push_str(&format!("Primary key: {}\n", columns.join(", "))),
    }

    out.push_str("\nSchema\n");
    if config.schema.is_empty() {
        out.push_str("  (no fields)\n");
    } else {
        out.push_str(&markdown(config.schema.iter().enumerate().map(|(i, f)| FieldRow {
            index: i,
            name: f.name.clone(),
            dtype: f.dtype.to_string(),
            nullable: f.nullable,
            constraints: constraints(f),
        })));
        out.push('\n');
    }

    out.push_str("\nRules\n");
    if config.rules.is_empty() {
        out.push_str("  (no rules)\n");
    } else {
        out.push_str(&markdown(config.rules.iter().enumerate().map(|(i, r)| RuleRow {
            index: i,
            name: r.name.clone(),
            severity: r.severity.to_string(),
            expression: r.expression.clone(),
        })));
        out.push('\n');
    }
    out
}

pub fn render_validation(result: &ValidationResult) -> String {
    let mut out = String::new();
    let status = if !result.is_valid() {
        "✗".red().to_string()
    } else if result.has_warnings() {
        "⚠".yellow().to_string()
    } else {
        "✓".green().to_string()
    };
    out.push_str(&format!("{} {}\n", status, result.dataset_name));
    for err in &result.errors {
        out.push_str(&format!("    {} [{}] {}\n", "✗".red(), err.code, err.message));
    }
    for warning in &result.warnings {
        out.push_str(&format!("    {} [{}] {}\n", "⚠".yellow(), warning.code, warning.message));
    }
    out
}

pub fn render_report(report: &AuditReport, min_severity: Severity) -> String {
    let mut out = String::new();
    out.push_str(&format!("Report {}\n", report.id));
    if let Some(dataset) = report.dataset_name() {
        out.push_str(&format!("Dataset: {}\n", dataset));
    }
    if let Some(source) = &report.source_file {
        out.push_str(&format!("Source: {}\n", source));
    }
    out.push_str(&format!(
        "Rows: {}  Columns: {}  Engine: {}  Issues: {}\n",
        report.summary.row_count,
        report.summary.column_count,
        report.summary.engine_used,
        report.summary.issues_found
    ));

    let indicators = derive_indicators(report);
    out.push_str("\nIndicators\n");
    if indicators.is_empty() {
        out.push_str(&format!("  {} no issues detected\n", "✓".green()));
    } else {
        out.push_str(&markdown(indicators.iter().map(IndicatorRow::from)));
        out.push('\n');
    }

    let issues = filter_by_severity(&derive_issue_log(report), min_severity);
    let counts = IssueCounts::of_issues(&issues);
    out.push_str(&format!(
        "\nIssue log ({} {}, {} {}, {} {})\n",
        counts.errors,
        severity_label(Severity::Error),
        counts.warnings,
        severity_label(Severity::Warning),
        counts.infos,
        severity_label(Severity::Info),
    ));
    if !issues.is_empty() {
        out.push_str(&markdown(issues.iter().map(IssueRow::from)));
        out.push('\n');
    }
    out
}

pub fn render_comparison(comparison: &ReportComparison, with_config_diff: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} -> {}\nIssues: {} -> {} ({})\n",
        comparison.report_a,
        comparison.report_b,
        comparison.issues_a,
        comparison.issues_b,
        signed(comparison.delta)
    ));

    let rules: Vec<DeltaRow> = comparison.changed_rules().map(DeltaRow::from).collect();
    if !rules.is_empty() {
        out.push_str("\nFailing rows by rule\n");
        out.push_str(&markdown(rules));
        out.push('\n');
    }

    let columns: Vec<DeltaRow> = comparison.changed_columns().map(DeltaRow::from).collect();
    if !columns.is_empty() {
        out.push_str("\nMissing values by column\n");
        out.push_str(&markdown(columns));
        out.push('\n');
    }

    if with_config_diff {
        if comparison.has_config_changes() {
            out.push_str("\nConfig diff\n");
            out.push_str(&comparison.config_diff());
        } else {
            out.push_str("\nConfigs are identical\n");
        }
    }
    out
}
