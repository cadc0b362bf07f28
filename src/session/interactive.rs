use std::borrow::Cow;
use std::path::PathBuf;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};
use crate::error::{AuditDeskError, Result};
use crate::gateway::Gateway;
use super::commands::ConsoleCommand;
use super::controller::Console;

const COMMANDS: &[&str] = &[
    "template", "config", "dataset", "pk", "field", "rule", "file", "columns",
    "validate", "run", "history", "ls", "open", "show", "issues", "compare",
    "diff", "delete", "rm", "download", "status", "help", "exit", "quit",
];

const SUBCOMMANDS: &[&str] = &["add", "set", "rm", "mv", "show", "load", "save"];

const FLAGS: &[&str] = &[
    "--name", "--dtype", "--nullable", "--min", "--max", "--allowed", "--regex",
    "--expr", "--severity", "--description", "--output", "--min-severity",
    "--config-diff", "--out", "--apply", "--clear",
];

const REPORT_COMMANDS: &[&str] = &["open", "show", "compare", "diff", "delete", "rm", "download"];

struct ConsoleHelper {
    report_ids: Vec<String>,
}

impl ConsoleHelper {
    fn new() -> Self {
        Self { report_ids: Vec::new() }
    }

    fn update_report_ids(&mut self, report_ids: Vec<String>) {
        self.report_ids = report_ids;
    }
}

fn pairs<'a>(candidates: impl Iterator<Item = &'a str>, prefix: &str) -> Vec<Pair> {
    candidates
        .filter(|c| c.starts_with(prefix))
        .map(|c| Pair {
            display: c.to_string(),
            replacement: c.to_string(),
        })
        .collect()
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_pos = &line[..pos];
        let words: Vec<&str> = line_to_pos.split_whitespace().collect();
        let at_boundary = line_to_pos.ends_with(' ');
        let start = if at_boundary {
            pos
        } else {
            line_to_pos.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0)
        };
        let prefix = if at_boundary { "" } else { words.last().copied().unwrap_or("") };

        if words.is_empty() || (words.len() == 1 && !at_boundary) {
            return Ok((start, pairs(COMMANDS.iter().copied(), prefix)));
        }

        if prefix.starts_with('-') {
            return Ok((start, pairs(FLAGS.iter().copied(), prefix)));
        }

        let cmd = words[0];
        let arg_position = if at_boundary { words.len() } else { words.len() - 1 };

        if matches!(cmd, "field" | "rule" | "config") && arg_position == 1 {
            return Ok((start, pairs(SUBCOMMANDS.iter().copied(), prefix)));
        }

        if REPORT_COMMANDS.contains(&cmd) && arg_position >= 1 {
            return Ok((start, pairs(self.report_ids.iter().map(String::as_str), prefix)));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let last_word = words.last().copied()?;

        if words.len() == 1 && !line.ends_with(' ') {
            for cmd in COMMANDS {
                if cmd.starts_with(last_word) && *cmd != last_word {
                    return Some(cmd[last_word.len()..].to_string());
                }
            }
        }

        None
    }
}

impl Highlighter for ConsoleHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        false
    }
}

impl Validator for ConsoleHelper {}

impl Helper for ConsoleHelper {}

pub struct InteractiveConsole<G: Gateway> {
    console: Console<G>,
    editor: Editor<ConsoleHelper, DefaultHistory>,
    history_path: PathBuf,
    template_on_start: bool,
}

impl<G: Gateway> InteractiveConsole<G> {
    pub fn new(console: Console<G>) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(rustyline::CompletionType::List)
            .build();

        let mut editor = Editor::with_config(config)
            .map_err(|e| AuditDeskError::Console(e.to_string()))?;
        editor.set_helper(Some(ConsoleHelper::new()));

        let history_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".auditdesk_history");

        let _ = editor.load_history(&history_path);

        Ok(Self {
            console,
            editor,
            history_path,
            template_on_start: true,
        })
    }

    /// Skip the template fetch when the session starts from a config file.
    pub fn with_template_on_start(mut self, enabled: bool) -> Self {
        self.template_on_start = enabled;
        self
    }

    fn sync_report_ids(&mut self) {
        let ids = self.console.history().iter().map(|m| m.id.clone()).collect();
        if let Some(helper) = self.editor.helper_mut() {
            helper.update_report_ids(ids);
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("auditdesk console - Type 'help' for commands, 'exit' to quit");

        if self.template_on_start {
            if let Err(e) = self.console.load_template().await {
                eprintln!("Warning: Failed to load template: {}", e.user_message());
            }
        }
        if let Err(e) = self.console.refresh_history().await {
            eprintln!("Warning: Failed to load history: {}", e.user_message());
        }
        self.sync_report_ids();

        loop {
            let prompt = match self.console.config().dataset_name.as_str() {
                "" => "auditdesk> ".to_string(),
                name => format!("{}> ", name),
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    match ConsoleCommand::parse_interactive(line) {
                        Ok(cmd) => {
                            let is_exit = matches!(cmd, ConsoleCommand::Exit);
                            let result = self.console.execute(cmd).await;

                            if let Some(output) = &result.output {
                                println!("{}", output);
                            }
                            if !result.success {
                                if let Some(error) = &result.error {
                                    eprintln!("Error: {}", error);
                                }
                            }

                            self.sync_report_ids();

                            if is_exit {
                                break;
                            }
                        }
                        Err(e) => {
                            eprintln!("Error: {}", e);
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("exit");
                    break;
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    break;
                }
            }
        }

        let _ = self.editor.save_history(&self.history_path);

        Ok(())
    }
}
