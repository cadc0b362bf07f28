use std::path::Path;
use serde_json::json;
use crate::config::{load_config, save_config, ConfigValidator, RulePatch, SchemaFieldPatch, Severity};
use crate::gateway::Gateway;
use crate::report::IssueCounts;
use super::commands::{ConsoleCommand, ConsoleResult};
use super::controller::Console;
use super::render::{self, OutputFormat};

const HELP: &str = r#"Available commands:
  template                              Load the engine's starter config
  config [show]                         Show the current config
  config load <path>                    Load config from a YAML/JSON file
  config save <path>                    Save config to a YAML/JSON file
  dataset <name>                        Set the dataset name
  pk [<col, col, ...>]                  Set the primary key (clear if empty)
  field add                             Append a schema field
  field set <i> [--name N] [--dtype T] [--nullable B]
      [--min X|none] [--max X|none] [--allowed a,b,...] [--regex R]
  field rm <i> | field mv <from> <to>
  rule add                              Append a rule
  rule set <i> [--name N] [--expr E] [--severity S] [--description D]
  rule rm <i> | rule mv <from> <to>
  file <path>                           Select a dataset and infer its columns
  columns [--apply]                     Show inferred columns, or add them as fields
  validate                              Check the config before submitting
  run                                   Audit the selected dataset
  history [--output FORMAT]             List stored reports
  open <id>                             View a stored report
  issues [--min-severity S]             Issue log of the current report
  compare <a> <b> [--config-diff]       Compare two stored reports
  delete <id>                           Delete a stored report
  download <id> [--out PATH]            Save a stored report to disk
  status                                Show session status
  help                                  Show this help
  exit                                  Exit console"#;

impl<G: Gateway> Console<G> {
    pub async fn execute(&mut self, cmd: ConsoleCommand) -> ConsoleResult {
        match cmd {
            ConsoleCommand::Exit => ConsoleResult::empty_success(),
            ConsoleCommand::Help => ConsoleResult::success_with_output(HELP.to_string()),
            ConsoleCommand::Status => self.cmd_status(),
            ConsoleCommand::Template => self.cmd_template().await,
            ConsoleCommand::Config => self.cmd_config(),
            ConsoleCommand::ConfigLoad { path } => self.cmd_config_load(&path),
            ConsoleCommand::ConfigSave { path } => self.cmd_config_save(&path),
            ConsoleCommand::Dataset { name } => {
                self.config_mut().set_dataset_name(name);
                self.cmd_config()
            }
            ConsoleCommand::PrimaryKey { columns } => {
                match columns {
                    Some(raw) => self.config_mut().set_primary_key_raw(&raw),
                    None => self.config_mut().clear_primary_key(),
                }
                self.cmd_config()
            }
            ConsoleCommand::FieldAdd => {
                let index = self.config_mut().add_schema_field();
                ConsoleResult::success_with_output(format!("Added field #{}", index))
            }
            ConsoleCommand::FieldSet { index, patch } => self.cmd_field_set(index, patch),
            ConsoleCommand::FieldRemove { index } => match self.config_mut().remove_schema_field(index) {
                Ok(field) => ConsoleResult::success_with_output(format!("Removed field '{}'", field.name)),
                Err(e) => ConsoleResult::failure(e.to_string()),
            },
            ConsoleCommand::FieldMove { from, to } => match self.config_mut().move_schema_field(from, to) {
                Ok(()) => self.cmd_config(),
                Err(e) => ConsoleResult::failure(e.to_string()),
            },
            ConsoleCommand::RuleAdd => {
                let index = self.config_mut().add_rule();
                ConsoleResult::success_with_output(format!("Added rule #{}", index))
            }
            ConsoleCommand::RuleSet { index, patch } => self.cmd_rule_set(index, patch),
            ConsoleCommand::RuleRemove { index } => match self.config_mut().remove_rule(index) {
                Ok(rule) => ConsoleResult::success_with_output(format!("Removed rule '{}'", rule.name)),
                Err(e) => ConsoleResult::failure(e.to_string()),
            },
            ConsoleCommand::RuleMove { from, to } => match self.config_mut().move_rule(from, to) {
                Ok(()) => self.cmd_config(),
                Err(e) => ConsoleResult::failure(e.to_string()),
            },
            ConsoleCommand::File { path } => self.cmd_file(&path).await,
            ConsoleCommand::Columns { apply } => self.cmd_columns(apply),
            ConsoleCommand::Validate => self.cmd_validate(),
            ConsoleCommand::Run => self.cmd_run().await,
            ConsoleCommand::History { output } => self.cmd_history(output).await,
            ConsoleCommand::Open { id } => self.cmd_open(&id).await,
            ConsoleCommand::Issues { min_severity } => self.cmd_issues(min_severity),
            ConsoleCommand::Compare { a, b, config_diff } => {
                self.cmd_compare(a.as_deref(), b.as_deref(), config_diff).await
            }
            ConsoleCommand::Delete { id } => self.cmd_delete(&id).await,
            ConsoleCommand::Download { id, out } => self.cmd_download(&id, &out).await,
        }
    }

    fn cmd_status(&self) -> ConsoleResult {
        let state = self.state();
        let file = state
            .selected_file
            .as_ref()
            .map(|f| f.path.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());
        let report = state.report.as_ref().map(|r| r.id.as_str()).unwrap_or("(none)");
        let last = state.status.as_ref().map(|s| s.text.as_str()).unwrap_or("");

        let output = format!(
            "Dataset: {}\nFields: {}  Rules: {}\nFile: {}\nReport: {}\nHistory: {} reports\nLast: {}",
            state.config.dataset_name,
            state.config.schema.len(),
            state.config.rules.len(),
            file,
            report,
            state.history.len(),
            last
        );
        let data = json!({
            "dataset_name": state.config.dataset_name,
            "fields": state.config.schema.len(),
            "rules": state.config.rules.len(),
            "file": state.selected_file.as_ref().map(|f| f.upload.file_name.clone()),
            "report": state.report.as_ref().map(|r| r.id.clone()),
            "history": state.history.len(),
            "status": state.status,
        });
        ConsoleResult::success_with_both(output, data)
    }

    async fn cmd_template(&mut self) -> ConsoleResult {
        match self.load_template().await {
            Ok(_) => self.cmd_config(),
            Err(e) => ConsoleResult::failure(e.user_message()),
        }
    }

    fn cmd_config(&self) -> ConsoleResult {
        ConsoleResult::success_with_output(render::render_config(self.config()))
    }

    fn cmd_config_load(&mut self, path: &Path) -> ConsoleResult {
        match load_config(path) {
            Ok(config) => {
                self.replace_config(config);
                self.cmd_config()
            }
            Err(e) => ConsoleResult::failure(e.to_string()),
        }
    }

    fn cmd_config_save(&self, path: &Path) -> ConsoleResult {
        match save_config(self.config(), path) {
            Ok(()) => ConsoleResult::success_with_output(format!("Saved config to {}", path.display())),
            Err(e) => ConsoleResult::failure(e.to_string()),
        }
    }

    fn cmd_field_set(&mut self, index: usize, patch: SchemaFieldPatch) -> ConsoleResult {
        match self.config_mut().update_schema_field(index, patch) {
            Ok(()) => self.cmd_config(),
            Err(e) => ConsoleResult::failure(e.to_string()),
        }
    }

    fn cmd_rule_set(&mut self, index: usize, patch: RulePatch) -> ConsoleResult {
        match self.config_mut().update_rule(index, patch) {
            Ok(()) => self.cmd_config(),
            Err(e) => ConsoleResult::failure(e.to_string()),
        }
    }

    async fn cmd_file(&mut self, path: &Path) -> ConsoleResult {
        let request = match self.select_file(path).await {
            Ok(request) => request,
            Err(e) => return ConsoleResult::failure(e.user_message()),
        };
        let file_name = request.upload.file_name.clone();

        if self.infer_columns(request).await && !self.inferred_columns().is_empty() {
            ConsoleResult::success_with_output(format!(
                "Selected {}\nColumns: {}",
                file_name,
                self.inferred_columns().join(", ")
            ))
        } else {
            ConsoleResult::success_with_output(format!("Selected {}", file_name))
        }
    }

    fn cmd_columns(&mut self, apply: bool) -> ConsoleResult {
        if apply {
            let added = self.apply_inferred_columns();
            return ConsoleResult::success_with_output(format!("Added {} fields", added));
        }

        let columns = self.inferred_columns();
        if columns.is_empty() {
            ConsoleResult::success_with_output("No inferred columns".to_string())
        } else {
            ConsoleResult::success_with_both(columns.join("\n"), json!(columns))
        }
    }

    fn cmd_validate(&self) -> ConsoleResult {
        let result = ConfigValidator::validate(self.config());
        let output = render::render_validation(&result);
        if result.is_valid() {
            ConsoleResult::success_with_output(output)
        } else {
            ConsoleResult {
                success: false,
                output: Some(output),
                data: None,
                error: Some(format!("{} validation errors", result.errors.len())),
            }
        }
    }

    async fn cmd_run(&mut self) -> ConsoleResult {
        match self.run_audit().await {
            Ok(report) => {
                let output = render::render_report(report, Severity::Info);
                let data = json!({ "id": report.id, "issues_found": report.issues_found() });
                ConsoleResult::success_with_both(output, data)
            }
            Err(e) => ConsoleResult::failure(e.user_message()),
        }
    }

    async fn cmd_history(&mut self, output: OutputFormat) -> ConsoleResult {
        let history = match self.refresh_history().await {
            Ok(history) => history,
            Err(e) => return ConsoleResult::failure(e.user_message()),
        };
        match render::render_history(history, output) {
            Ok(text) => ConsoleResult::success_with_output(text),
            Err(e) => ConsoleResult::failure(e.to_string()),
        }
    }

    async fn cmd_open(&mut self, id: &str) -> ConsoleResult {
        match self.open_report(id).await {
            Ok(report) => ConsoleResult::success_with_output(render::render_report(report, Severity::Info)),
            Err(e) => ConsoleResult::failure(e.user_message()),
        }
    }

    fn cmd_issues(&self, min_severity: Severity) -> ConsoleResult {
        let report = match self.report() {
            Some(report) => report,
            None => return ConsoleResult::failure("No report open. Use 'run' or 'open <id>'".to_string()),
        };
        let issues = self.issue_log().unwrap_or_default();
        let counts = IssueCounts::of_issues(&issues);
        let output = render::render_report(report, min_severity);
        ConsoleResult::success_with_both(output, json!({ "counts": counts, "issues": issues }))
    }

    async fn cmd_compare(&mut self, a: Option<&str>, b: Option<&str>, config_diff: bool) -> ConsoleResult {
        match self.compare(a, b).await {
            Ok(comparison) => {
                let output = render::render_comparison(&comparison, config_diff);
                let data = serde_json::to_value(&comparison).unwrap_or_default();
                ConsoleResult::success_with_both(output, data)
            }
            Err(e) => ConsoleResult::failure(e.user_message()),
        }
    }

    async fn cmd_delete(&mut self, id: &str) -> ConsoleResult {
        match self.delete_report(id).await {
            Ok(()) => ConsoleResult::success_with_output(format!("Deleted report {}", id)),
            Err(e) => ConsoleResult::failure(e.user_message()),
        }
    }

    async fn cmd_download(&mut self, id: &str, out: &Path) -> ConsoleResult {
        match self.download_report(id, out).await {
            Ok(bytes) => ConsoleResult::success_with_output(format!(
                "Saved report {} to {} ({} bytes)",
                id,
                out.display(),
                bytes
            )),
            Err(e) => ConsoleResult::failure(e.user_message()),
        }
    }
}
