// cm - daily mandate reconciliation
// Imports the day's exports, resolves each cancelled or failed mandate to a
// CRM account, and writes one file per team.

mod exit_codes;
mod pipeline;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mandates_config::{ConfigError, LookupMode, PathOverrides, RunPaths, RunSettings};
use mandates_io::IoError;

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_INPUT, EXIT_OUTPUT, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "cm")]
#[command(about = "Reconcile cancelled and failed mandates against CRM and billing exports")]
#[command(version)]
#[command(subcommand_required = false)]
#[command(after_help = "\
Examples:
  cm
  cm --date 2026-10-14 --json
  cm import --crm exports/crm.csv
  cm export --lookup store --to-check /tmp/check.csv")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: RunArgs,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Import all exports, then resolve and write team files (default)
    Run,
    /// Import exports into the store only
    Import,
    /// Resolve the day's stored events and write team files only
    Export,
}

#[derive(Args)]
struct RunArgs {
    /// SQLite database file
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Elevate billing accounts export
    #[arg(long, global = true, value_name = "FILE")]
    elevate: Option<PathBuf>,

    /// CRM accounts export
    #[arg(long, global = true, value_name = "FILE")]
    crm: Option<PathBuf>,

    /// Cancelled mandates export
    #[arg(long, global = true, value_name = "FILE")]
    cancelled: Option<PathBuf>,

    /// Failed mandates export
    #[arg(long, global = true, value_name = "FILE")]
    failed: Option<PathBuf>,

    /// Output for the pre-installation team
    #[arg(long, global = true, value_name = "FILE")]
    to_pre: Option<PathBuf>,

    /// Output for the post-installation team
    #[arg(long, global = true, value_name = "FILE")]
    to_post: Option<PathBuf>,

    /// Output for rows needing no action (to check)
    #[arg(long, global = true, value_name = "FILE")]
    to_check: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(long, global = true, env = "CM_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run date, YYYY-MM-DD (default: today)
    #[arg(long, global = true, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// CRM lookup backend: index or store
    #[arg(long, global = true, value_parser = parse_lookup)]
    lookup: Option<LookupMode>,

    /// Print the run report as JSON to stdout
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

impl RunArgs {
    fn overrides(&self) -> PathOverrides {
        PathOverrides {
            database: self.db.clone(),
            elevate: self.elevate.clone(),
            crm: self.crm.clone(),
            cancelled: self.cancelled.clone(),
            failed: self.failed.clone(),
            pre: self.to_pre.clone(),
            post: self.to_post.clone(),
            check: self.to_check.clone(),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, mandates_recon::DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_lookup(s: &str) -> Result<LookupMode, String> {
    s.parse().map_err(|e: ConfigError| e.to_string())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn log_level(verbose: bool, settings: &RunSettings) -> String {
    if verbose {
        return "debug".to_string();
    }
    settings
        .log
        .level
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "info".to_string())
}

/// The file an output path will actually open: the canonical parent joined
/// with the file name, or the canonical file itself when it already exists.
/// Paths whose parent does not exist are returned as given; creating them
/// fails later with an output error.
fn output_identity(path: &Path) -> PathBuf {
    if let Ok(existing) = path.canonicalize() {
        return existing;
    }
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let args = cli.args;
    let settings = RunSettings::load(args.config.as_deref()).map_err(CliError::config)?;
    init_logging(&log_level(args.verbose, &settings));

    let lookup = match args.lookup {
        Some(mode) => mode,
        None => settings.lookup_mode().map_err(CliError::config)?,
    };
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let paths = RunPaths::resolve(&settings, &args.overrides(), date, &mandates_config::paths::executable_dir());

    let pre = output_identity(&paths.pre);
    let post = output_identity(&paths.post);
    let check = output_identity(&paths.check);
    if pre == post || pre == check || post == check {
        return Err(CliError::usage("the three output files must be different paths")
            .with_hint("check --to-pre, --to-post, --to-check and [outputs] in the settings file"));
    }

    let phases = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => pipeline::Phases { import: true, export: true },
        Commands::Import => pipeline::Phases { import: true, export: false },
        Commands::Export => pipeline::Phases { import: false, export: true },
    };

    let report = pipeline::execute(phases, &paths, date, lookup)?;
    pipeline::print_summary(&report);

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Read { .. } => Some("check the --config path or CM_CONFIG".to_string()),
            _ => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }

    /// Map an IO-layer error. `fallback` is the code for CSV and file errors
    /// in the current phase.
    pub fn io(err: IoError, fallback: u8) -> Self {
        let (code, hint) = match &err {
            IoError::Sqlite(_) => (EXIT_STORE, Some("check the --db path and that the file is a SQLite database")),
            IoError::MissingHeader { .. } => (EXIT_INPUT, Some("each export must start with a header row")),
            IoError::OutputUnwritable { .. } => (EXIT_OUTPUT, Some("does the output directory exist?")),
            IoError::Csv(_) | IoError::Io(_) => (fallback, None),
        };
        Self { code, message: err.to_string(), hint: hint.map(str::to_string) }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
