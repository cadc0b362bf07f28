use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auditdesk::config::{load_config, ConfigValidator, Severity};
use auditdesk::error::AuditDeskError;
use auditdesk::gateway::{DatasetUpload, Gateway, GatewayConfig, HttpGateway};
use auditdesk::session::{
    render_comparison, render_config, render_history, render_report, render_validation,
    Console, InteractiveConsole, OutputFormat,
};

#[derive(Parser)]
#[command(name = "auditdesk")]
#[command(about = "Operator console for a dataset audit engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Base URL of the audit engine
    #[arg(short, long, env = "AUDITDESK_URL", default_value = "http://localhost:8000")]
    url: String,

    /// Request timeout in seconds
    #[arg(long, env = "AUDITDESK_TIMEOUT", default_value = "60")]
    timeout: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive console (default)
    Console {
        /// Start from a config file instead of the engine's template
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the engine's starter config
    Template {
        /// Output format: table, yaml, json
        #[arg(short, long, default_value = "yaml")]
        output: OutputFormat,
    },

    /// List stored reports
    History {
        /// Output format: table, yaml, json
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// Show a stored report with its indicators and issue log
    Show {
        /// Report id
        id: String,

        /// Hide issues below this severity (info, warning, error)
        #[arg(short = 's', long, default_value = "info", value_parser = parse_severity)]
        min_severity: Severity,

        /// Output format: table, yaml, json
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// Audit a dataset file against a config file
    Run {
        /// Dataset file to upload
        #[arg(short, long)]
        file: PathBuf,

        /// Config file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Compare two stored reports
    Compare {
        /// First report id
        a: String,

        /// Second report id
        b: String,

        /// Show a diff of the two configs
        #[arg(long)]
        config_diff: bool,
    },

    /// Delete a stored report
    Delete {
        /// Report id
        id: String,
    },

    /// Save a stored report to disk
    Download {
        /// Report id
        id: String,

        /// Destination path
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Ask the engine for a dataset's column names
    Columns {
        /// Dataset file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check a config file without submitting it
    Validate {
        /// Config file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    Severity::parse(s).ok_or_else(|| format!("unknown severity '{}'", s))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("auditdesk=debug,info")
    } else {
        EnvFilter::new("auditdesk=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(e);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: Box<dyn std::error::Error>) {
    if let Some(desk_err) = err.downcast_ref::<AuditDeskError>() {
        if let AuditDeskError::Transport { status: Some(status), .. } = desk_err {
            eprintln!("{} [{}] {}", "✗ Engine error".red(), status, desk_err.user_message());
            return;
        }
        eprintln!("{} {}", "✗ Error:".red(), desk_err.user_message());
        return;
    }

    eprintln!("{} {}", "✗ Error:".red(), err);
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Validation needs no engine.
    if let Some(Commands::Validate { config }) = &cli.command {
        return cmd_validate(config);
    }

    let gateway = HttpGateway::new(GatewayConfig::new(cli.url.clone()).with_timeout(cli.timeout))?;

    match cli.command {
        None => run_console(Console::new(gateway), None).await?,
        Some(Commands::Console { config }) => run_console(Console::new(gateway), config).await?,
        Some(Commands::Template { output }) => {
            let template = gateway.fetch_template().await?;
            match output {
                OutputFormat::Table => println!("{}", render_config(&template)),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&template)?),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&template)?),
            }
        }
        Some(Commands::History { output }) => {
            let history = gateway.list_reports().await?;
            println!("{}", render_history(&history, output)?);
        }
        Some(Commands::Show { id, min_severity, output }) => {
            let report = gateway.get_report(&id).await?;
            match output {
                OutputFormat::Table => println!("{}", render_report(&report, min_severity)),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Some(Commands::Run { file, config }) => {
            let config = load_config(&config)?;
            let mut console = Console::new(gateway).with_config(config);
            console.select_file(&file).await?;
            let report = console.run_audit().await?;
            println!("{}", render_report(report, Severity::Info));
            if report.issues_found() > 0 {
                warn!("{} issues found", report.issues_found());
            }
        }
        Some(Commands::Compare { a, b, config_diff }) => {
            let mut console = Console::new(gateway);
            let comparison = console.compare(Some(a.as_str()), Some(b.as_str())).await?;
            println!("{}", render_comparison(&comparison, config_diff));
        }
        Some(Commands::Delete { id }) => {
            gateway.delete_report(&id).await?;
            println!("{} Deleted report {}", "✓".green(), id);
        }
        Some(Commands::Download { id, out }) => {
            let mut console = Console::new(gateway);
            let bytes = console.download_report(&id, &out).await?;
            println!("{} Saved report {} to {} ({} bytes)", "✓".green(), id, out.display(), bytes);
        }
        Some(Commands::Columns { file }) => {
            let bytes = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let columns = gateway.infer_columns(&DatasetUpload::new(file_name, bytes)).await?;
            for column in columns {
                println!("{}", column);
            }
        }
        Some(Commands::Validate { .. }) => {}
    }

    Ok(())
}

fn cmd_validate(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating {}", path.display());
    let config = load_config(path)?;
    let result = ConfigValidator::validate(&config);
    print!("{}", render_validation(&result));

    println!();
    if !result.is_valid() {
        return Err(format!(
            "Validation failed: {} errors, {} warnings",
            result.errors.len(),
            result.warnings.len()
        )
        .into());
    }

    println!(
        "{} Config is valid ({} warnings)",
        "✓".green(),
        result.warnings.len()
    );
    Ok(())
}

async fn run_console<G: Gateway>(
    mut console: Console<G>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let from_file = config.is_some();
    if let Some(path) = config {
        console.replace_config(load_config(&path)?);
    }

    let mut interactive = InteractiveConsole::new(console)?.with_template_on_start(!from_file);
    interactive.run().await?;
    Ok(())
}
