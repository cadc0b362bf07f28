use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::config::{Dtype, RulePatch, SchemaFieldPatch, Severity};
use crate::error::{AuditDeskError, Result};
use super::render::OutputFormat;

#[derive(Debug, Clone)]
pub enum ConsoleCommand {
    Template,
    Config,
    ConfigLoad { path: PathBuf },
    ConfigSave { path: PathBuf },
    Dataset { name: String },
    PrimaryKey { columns: Option<String> },
    FieldAdd,
    FieldSet { index: usize, patch: SchemaFieldPatch },
    FieldRemove { index: usize },
    FieldMove { from: usize, to: usize },
    RuleAdd,
    RuleSet { index: usize, patch: RulePatch },
    RuleRemove { index: usize },
    RuleMove { from: usize, to: usize },
    File { path: PathBuf },
    Columns { apply: bool },
    Validate,
    Run,
    History { output: OutputFormat },
    Open { id: String },
    Issues { min_severity: Severity },
    Compare { a: Option<String>, b: Option<String>, config_diff: bool },
    Delete { id: String },
    Download { id: String, out: PathBuf },
    Status,
    Help,
    Exit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConsoleResult {
    pub fn success_with_output(output: String) -> Self {
        Self {
            success: true,
            output: Some(output),
            data: None,
            error: None,
        }
    }

    pub fn success_with_both(output: String, data: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            output: None,
            data: None,
            error: Some(error),
        }
    }

    pub fn empty_success() -> Self {
        Self {
            success: true,
            output: None,
            data: None,
            error: None,
        }
    }
}

fn usage(message: &str) -> AuditDeskError {
    AuditDeskError::Console(message.to_string())
}

impl ConsoleCommand {
    pub fn parse_interactive(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(usage("Empty command"));
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "exit" | "quit" | "q" => Ok(ConsoleCommand::Exit),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "status" => Ok(ConsoleCommand::Status),
            "template" => Ok(ConsoleCommand::Template),
            "validate" => Ok(ConsoleCommand::Validate),
            "run" => Ok(ConsoleCommand::Run),
            "config" => match parts.get(1).map(|s| s.to_lowercase()).as_deref() {
                None | Some("show") => Ok(ConsoleCommand::Config),
                Some("load") => {
                    let path = parts.get(2).ok_or_else(|| usage("config load requires a path"))?;
                    Ok(ConsoleCommand::ConfigLoad { path: PathBuf::from(path) })
                }
                Some("save") => {
                    let path = parts.get(2).ok_or_else(|| usage("config save requires a path"))?;
                    Ok(ConsoleCommand::ConfigSave { path: PathBuf::from(path) })
                }
                Some(other) => Err(AuditDeskError::Console(format!("Unknown config action: {}", other))),
            },
            "dataset" => {
                let name = rest(&parts, 1);
                if name.is_empty() {
                    return Err(usage("dataset requires a name"));
                }
                Ok(ConsoleCommand::Dataset { name })
            }
            "pk" => {
                let raw = rest(&parts, 1);
                let columns = if raw.is_empty() || raw == "--clear" { None } else { Some(raw) };
                Ok(ConsoleCommand::PrimaryKey { columns })
            }
            "field" => Self::parse_field(&parts),
            "rule" => Self::parse_rule(&parts),
            "file" => {
                let path = rest(&parts, 1);
                if path.is_empty() {
                    return Err(usage("file requires a path"));
                }
                Ok(ConsoleCommand::File { path: PathBuf::from(path) })
            }
            "columns" => Ok(ConsoleCommand::Columns { apply: has_flag(&parts, "--apply") }),
            "history" | "ls" => {
                let output = match find_arg(&parts, "--output", "-o") {
                    Some(raw) => OutputFormat::parse(&raw)
                        .ok_or_else(|| AuditDeskError::Console(format!("Unknown output format: {}", raw)))?,
                    None => OutputFormat::Table,
                };
                Ok(ConsoleCommand::History { output })
            }
            "open" | "show" => {
                let id = positional(&parts, 1).ok_or_else(|| usage("open requires a report id"))?;
                Ok(ConsoleCommand::Open { id })
            }
            "issues" => {
                let min_severity = match find_arg(&parts, "--min-severity", "-s") {
                    Some(raw) => Severity::parse(&raw)
                        .ok_or_else(|| AuditDeskError::Console(format!("Unknown severity: {}", raw)))?,
                    None => Severity::Info,
                };
                Ok(ConsoleCommand::Issues { min_severity })
            }
            "compare" | "diff" => Ok(ConsoleCommand::Compare {
                a: positional(&parts, 1),
                b: positional(&parts, 2),
                config_diff: has_flag(&parts, "--config-diff"),
            }),
            "delete" | "rm" => {
                let id = positional(&parts, 1).ok_or_else(|| usage("delete requires a report id"))?;
                Ok(ConsoleCommand::Delete { id })
            }
            "download" => {
                let id = positional(&parts, 1).ok_or_else(|| usage("download requires a report id"))?;
                let out = find_arg(&parts, "--out", "-o")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(format!("report_{}.json", id)));
                Ok(ConsoleCommand::Download { id, out })
            }
            _ => Err(AuditDeskError::Console(format!("Unknown command: {}", cmd))),
        }
    }

    fn parse_field(parts: &[&str]) -> Result<Self> {
        let action = parts.get(1).map(|s| s.to_lowercase());
        match action.as_deref() {
            Some("add") => Ok(ConsoleCommand::FieldAdd),
            Some("rm") | Some("remove") => Ok(ConsoleCommand::FieldRemove {
                index: index_at(parts, 2, "field remove")?,
            }),
            Some("mv") | Some("move") => Ok(ConsoleCommand::FieldMove {
                from: index_at(parts, 2, "field move")?,
                to: index_at(parts, 3, "field move")?,
            }),
            Some("set") => {
                let index = index_at(parts, 2, "field set")?;
                let mut patch = SchemaFieldPatch::new();
                if let Some(name) = find_arg(parts, "--name", "-n") {
                    patch = patch.with_name(name);
                }
                if let Some(raw) = find_arg(parts, "--dtype", "-t") {
                    let dtype = Dtype::parse(&raw)
                        .ok_or_else(|| AuditDeskError::Console(format!("Unknown dtype: {}", raw)))?;
                    patch = patch.with_dtype(dtype);
                }
                if let Some(raw) = find_arg(parts, "--nullable", "") {
                    patch = patch.with_nullable(parse_bool(&raw)?);
                }
                if let Some(raw) = find_arg(parts, "--min", "") {
                    patch = patch.with_min(parse_bound(&raw)?);
                }
                if let Some(raw) = find_arg(parts, "--max", "") {
                    patch = patch.with_max(parse_bound(&raw)?);
                }
                if let Some(raw) = find_text_arg(parts, "--allowed") {
                    patch = patch.with_allowed_values_raw(&raw);
                }
                if let Some(raw) = find_text_arg(parts, "--regex") {
                    let regex = if raw.is_empty() || raw == "none" { None } else { Some(raw) };
                    patch = patch.with_regex(regex);
                }
                Ok(ConsoleCommand::FieldSet { index, patch })
            }
            _ => Err(usage("field requires action: add, set, rm or mv")),
        }
    }

    fn parse_rule(parts: &[&str]) -> Result<Self> {
        let action = parts.get(1).map(|s| s.to_lowercase());
        match action.as_deref() {
            Some("add") => Ok(ConsoleCommand::RuleAdd),
            Some("rm") | Some("remove") => Ok(ConsoleCommand::RuleRemove {
                index: index_at(parts, 2, "rule remove")?,
            }),
            Some("mv") | Some("move") => Ok(ConsoleCommand::RuleMove {
                from: index_at(parts, 2, "rule move")?,
                to: index_at(parts, 3, "rule move")?,
            }),
            Some("set") => {
                let index = index_at(parts, 2, "rule set")?;
                let mut patch = RulePatch::new();
                if let Some(name) = find_arg(parts, "--name", "-n") {
                    patch = patch.with_name(name);
                }
                if let Some(expression) = find_text_arg(parts, "--expr") {
                    patch = patch.with_expression(expression);
                }
                if let Some(raw) = find_arg(parts, "--severity", "-s") {
                    let severity = Severity::parse(&raw)
                        .ok_or_else(|| AuditDeskError::Console(format!("Unknown severity: {}", raw)))?;
                    patch = patch.with_severity(severity);
                }
                if let Some(description) = find_text_arg(parts, "--description") {
                    let description = if description.is_empty() { None } else { Some(description) };
                    patch = patch.with_description(description);
                }
                Ok(ConsoleCommand::RuleSet { index, patch })
            }
            _ => Err(usage("rule requires action: add, set, rm or mv")),
        }
    }
}

fn find_arg(parts: &[&str], long: &str, short: &str) -> Option<String> {
    for (i, &part) in parts.iter().enumerate() {
        if part == long || (!short.is_empty() && part == short) {
            return parts.get(i + 1).map(|s| s.to_string());
        }
        if let Some(value) = part.strip_prefix(&format!("{}=", long)) {
            return Some(value.to_string());
        }
        if !short.is_empty() {
            if let Some(value) = part.strip_prefix(&format!("{}=", short)) {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Value of `long` running up to the next `--flag`, so it may contain spaces.
fn find_text_arg(parts: &[&str], long: &str) -> Option<String> {
    let start = parts.iter().position(|&p| p == long)?;
    let words: Vec<&str> = parts[start + 1..]
        .iter()
        .take_while(|p| !p.starts_with("--"))
        .copied()
        .collect();
    Some(words.join(" "))
}

fn has_flag(parts: &[&str], flag: &str) -> bool {
    parts.iter().any(|&p| p == flag)
}

fn rest(parts: &[&str], skip: usize) -> String {
    parts.iter().skip(skip).copied().collect::<Vec<_>>().join(" ")
}

/// The `n`th word that is neither a flag nor a flag's value.
fn positional(parts: &[&str], n: usize) -> Option<String> {
    let mut seen = 0;
    let mut skip_next = false;
    for &part in parts {
        if skip_next {
            skip_next = false;
            continue;
        }
        if part.starts_with('-') {
            skip_next = !part.contains('=') && takes_value(part);
            continue;
        }
        if seen == n {
            return Some(part.to_string());
        }
        seen += 1;
    }
    None
}

fn takes_value(flag: &str) -> bool {
    matches!(flag, "--output" | "-o" | "--out" | "--min-severity" | "-s")
}

fn index_at(parts: &[&str], position: usize, command: &str) -> Result<usize> {
    let raw = parts
        .get(position)
        .ok_or_else(|| AuditDeskError::Console(format!("{} requires an index", command)))?;
    raw.parse()
        .map_err(|_| AuditDeskError::Console(format!("Invalid index: {}", raw)))
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(AuditDeskError::Console(format!("Invalid boolean: {}", raw))),
    }
}

fn parse_bound(raw: &str) -> Result<Option<f64>> {
    if raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| AuditDeskError::Console(format!("Invalid number: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exit() {
        let cmd = ConsoleCommand::parse_interactive("exit").unwrap();
        assert!(matches!(cmd, ConsoleCommand::Exit));

        let cmd = ConsoleCommand::parse_interactive("quit").unwrap();
        assert!(matches!(cmd, ConsoleCommand::Exit));
    }

    #[test]
    fn test_parse_empty() {
        assert!(ConsoleCommand::parse_interactive("   ").is_err());
    }

    #[test]
    fn test_parse_dataset_with_spaces() {
        let cmd = ConsoleCommand::parse_interactive("dataset customer orders").unwrap();
        if let ConsoleCommand::Dataset { name } = cmd {
            assert_eq!(name, "customer orders");
        } else {
            panic!("Expected Dataset command");
        }
    }

    #[test]
    fn test_parse_pk_clear() {
        let cmd = ConsoleCommand::parse_interactive("pk").unwrap();
        assert!(matches!(cmd, ConsoleCommand::PrimaryKey { columns: None }));

        let cmd = ConsoleCommand::parse_interactive("pk id, region").unwrap();
        if let ConsoleCommand::PrimaryKey { columns } = cmd {
            assert_eq!(columns.as_deref(), Some("id, region"));
        } else {
            panic!("Expected PrimaryKey command");
        }
    }

    #[test]
    fn test_parse_field_set() {
        let cmd = ConsoleCommand::parse_interactive(
            "field set 2 --name amount --dtype float --nullable false --min 0 --max none",
        )
        .unwrap();
        if let ConsoleCommand::FieldSet { index, patch } = cmd {
            assert_eq!(index, 2);
            assert_eq!(patch.name.as_deref(), Some("amount"));
            assert_eq!(patch.dtype, Some(Dtype::Float));
            assert_eq!(patch.nullable, Some(false));
            assert_eq!(patch.min, Some(Some(0.0)));
            assert_eq!(patch.max, Some(None));
        } else {
            panic!("Expected FieldSet command");
        }
    }

    #[test]
    fn test_parse_field_allowed_values() {
        let cmd = ConsoleCommand::parse_interactive("field set 0 --allowed a, b , c").unwrap();
        if let ConsoleCommand::FieldSet { patch, .. } = cmd {
            assert_eq!(
                patch.allowed_values,
                Some(Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]))
            );
        } else {
            panic!("Expected FieldSet command");
        }
    }

    #[test]
    fn test_parse_rule_set_expression() {
        let cmd = ConsoleCommand::parse_interactive(
            "rule set 0 --expr amount > 0 and amount < 100 --severity error",
        )
        .unwrap();
        if let ConsoleCommand::RuleSet { index, patch } = cmd {
            assert_eq!(index, 0);
            assert_eq!(patch.expression.as_deref(), Some("amount > 0 and amount < 100"));
            assert_eq!(patch.severity, Some(Severity::Error));
        } else {
            panic!("Expected RuleSet command");
        }
    }

    #[test]
    fn test_parse_bad_index() {
        assert!(ConsoleCommand::parse_interactive("field rm x").is_err());
        assert!(ConsoleCommand::parse_interactive("rule mv 1").is_err());
    }

    #[test]
    fn test_parse_compare() {
        let cmd = ConsoleCommand::parse_interactive("compare r1 r2 --config-diff").unwrap();
        if let ConsoleCommand::Compare { a, b, config_diff } = cmd {
            assert_eq!(a.as_deref(), Some("r1"));
            assert_eq!(b.as_deref(), Some("r2"));
            assert!(config_diff);
        } else {
            panic!("Expected Compare command");
        }

        let cmd = ConsoleCommand::parse_interactive("compare r1").unwrap();
        assert!(matches!(cmd, ConsoleCommand::Compare { b: None, .. }));
    }

    #[test]
    fn test_parse_history_output() {
        let cmd = ConsoleCommand::parse_interactive("history --output=json").unwrap();
        assert!(matches!(cmd, ConsoleCommand::History { output: OutputFormat::Json }));
        assert!(ConsoleCommand::parse_interactive("history -o csv").is_err());
    }

    #[test]
    fn test_parse_download_default_path() {
        let cmd = ConsoleCommand::parse_interactive("download abc").unwrap();
        if let ConsoleCommand::Download { id, out } = cmd {
            assert_eq!(id, "abc");
            assert_eq!(out, PathBuf::from("report_abc.json"));
        } else {
            panic!("Expected Download command");
        }

        let cmd = ConsoleCommand::parse_interactive("download -o out.json abc").unwrap();
        if let ConsoleCommand::Download { id, out } = cmd {
            assert_eq!(id, "abc");
            assert_eq!(out, PathBuf::from("out.json"));
        } else {
            panic!("Expected Download command");
        }
    }

    #[test]
    fn test_parse_issues_severity() {
        let cmd = ConsoleCommand::parse_interactive("issues --min-severity warning").unwrap();
        assert!(matches!(cmd, ConsoleCommand::Issues { min_severity: Severity::Warning }));
    }

    #[test]
    fn test_parse_unknown() {
        assert!(ConsoleCommand::parse_interactive("frobnicate").is_err());
    }
}
