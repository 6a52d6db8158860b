//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use sticky_file::core::config::Config;
use sticky_file::core::errors::StickyError;
use sticky_file::host::driver::{Driver, RunReport};
use sticky_file::host::manifest::Manifest;
use sticky_file::host::store::StateStore;
use sticky_file::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use sticky_file::model::diagnostics::{Diagnostic, Diagnostics};
use sticky_file::plan::planner::plan;
use sticky_file::resource::reconciler::StickyFileResource;
use sticky_file::resource::schema::sticky_file_schema;

/// Keeps local files in existence across runs, regenerating them when they vanish.
#[derive(Debug, Parser)]
#[command(
    name = "sticky",
    author,
    version,
    about = "Sticky local files - regenerate managed files that went missing",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Override the manifest path.
    #[arg(long, global = true, value_name = "PATH")]
    manifest: Option<PathBuf>,
    /// Override the state file path.
    #[arg(long, global = true, value_name = "PATH")]
    state: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Check the manifest without touching disk or state.
    Validate,
    /// Show what apply would do.
    Plan,
    /// Converge files and state on the manifest.
    Apply,
    /// Regenerate managed files that vanished.
    Refresh,
    /// Delete every managed file and forget it.
    Destroy,
    /// Adopt an existing file under a resource name.
    Import(ImportArgs),
    /// List stored records.
    Show,
    /// Print the resource schema.
    Schema,
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ImportArgs {
    /// Resource name to store the record under.
    name: String,
    /// Path of the file to adopt.
    path: String,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input: config, manifest, or arguments.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Some resources converged, some did not.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<StickyError> for CliError {
    fn from(err: StickyError) -> Self {
        match err {
            StickyError::InvalidConfig { .. }
            | StickyError::MissingConfig { .. }
            | StickyError::ConfigParse { .. }
            | StickyError::Validation { .. }
            | StickyError::StateConflict { .. } => Self::User(err.to_string()),
            StickyError::Serialization { .. } => Self::Internal(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Validate => run_validate(cli),
        Command::Plan => run_plan(cli),
        Command::Apply => run_driver(cli, "apply"),
        Command::Refresh => run_driver(cli, "refresh"),
        Command::Destroy => run_driver(cli, "destroy"),
        Command::Import(args) => run_import(cli, args),
        Command::Show => run_show(cli),
        Command::Schema => run_schema(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── session setup ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(manifest) = &cli.manifest {
        config.paths.manifest.clone_from(manifest);
    }
    if let Some(state) = &cli.state {
        config.paths.state_file.clone_from(state);
    }
    Ok(config)
}

fn open_driver(config: &Config) -> Result<Driver, CliError> {
    let store = StateStore::load(&config.paths.state_file)?;
    let mut resource = StickyFileResource::new();
    if config.logging.enabled {
        let writer = JsonlWriter::open(JsonlConfig::from_settings(
            config.paths.activity_log.clone(),
            config.paths.activity_log_fallback.clone(),
            &config.logging,
        ));
        resource = resource.with_activity_log(writer);
    }
    Ok(Driver::new(resource, store))
}

/// Persist the store and flush the activity log.
fn close_driver(driver: Driver, config: &Config) -> Result<(), CliError> {
    let (resource, store) = driver.into_parts();
    let saved = store.save(&config.paths.state_file);
    if let Some(mut log) = resource.into_activity_log() {
        if let Err(err) = &saved {
            let mut entry = LogEntry::new(EventType::Error, Severity::Critical);
            entry.ok = Some(false);
            entry.error_code = Some(err.code().to_string());
            entry.error_message = Some(err.to_string());
            log.write_entry(&entry);
        }
        log.fsync();
    }
    saved.map_err(CliError::from)
}

// ──────────────────── commands ────────────────────

fn run_validate(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let manifest = Manifest::load(&config.paths.manifest)?;

    let results: Vec<(String, Diagnostics)> = manifest
        .files
        .iter()
        .map(|(name, file)| {
            let diags = plan(file, None).err().unwrap_or_default();
            (name.clone(), diags)
        })
        .collect();
    let invalid = results.iter().filter(|(_, d)| d.has_error()).count();

    match output_mode(cli) {
        OutputMode::Human => {
            for (name, diags) in &results {
                if diags.has_error() {
                    println!("{} {name}", "invalid".red().bold());
                    print_diagnostics(diags);
                } else {
                    println!("{} {name}", "ok".green());
                }
            }
            println!(
                "{} resource(s) in {}, {invalid} invalid",
                results.len(),
                config.paths.manifest.display()
            );
        }
        OutputMode::Json => {
            let resources: Vec<Value> = results
                .iter()
                .map(|(name, diags)| {
                    json!({
                        "name": name,
                        "valid": !diags.has_error(),
                        "diagnostics": diags,
                    })
                })
                .collect();
            write_json_line(&json!({
                "command": "validate",
                "manifest": config.paths.manifest.to_string_lossy(),
                "valid": invalid == 0,
                "resources": resources,
            }))?;
        }
    }

    if invalid > 0 {
        return Err(CliError::User(format!("{invalid} resource(s) failed validation")));
    }
    Ok(())
}

fn run_plan(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let manifest = Manifest::load(&config.paths.manifest)?;
    let store = StateStore::load(&config.paths.state_file)?;
    let driver = Driver::new(StickyFileResource::new(), store);

    let report = driver.plan(&manifest);
    emit_report(cli, &report)?;
    if report.failed() {
        return Err(CliError::User(format!(
            "{} resource(s) failed validation",
            report.failed_count()
        )));
    }
    Ok(())
}

fn run_driver(cli: &Cli, command: &'static str) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let manifest = if command == "apply" {
        Some(Manifest::load(&config.paths.manifest)?)
    } else {
        None
    };
    let mut driver = open_driver(&config)?;

    let report = match &manifest {
        Some(manifest) => driver.apply(manifest),
        None if command == "destroy" => driver.destroy(),
        None => driver.refresh(),
    };
    close_driver(driver, &config)?;
    emit_report(cli, &report)?;
    outcome_error(&report)
}

fn run_import(cli: &Cli, args: &ImportArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let mut driver = open_driver(&config)?;
    let report = driver.import(&args.name, &args.path);
    close_driver(driver, &config)?;
    emit_report(cli, &report)?;

    match report.resources.iter().find_map(|r| r.diagnostics.first_error()) {
        Some(diag) if diag.code == Some("STK-3002") => Err(CliError::User(diag_line(diag))),
        Some(diag) => Err(CliError::Runtime(diag_line(diag))),
        None => Ok(()),
    }
}

fn run_show(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let store = StateStore::load(&config.paths.state_file)?;

    match output_mode(cli) {
        OutputMode::Human => {
            if store.is_empty() {
                println!("No managed files in {}", config.paths.state_file.display());
            }
            for (name, file) in store.iter() {
                println!(
                    "{:<20} {} {:>8} B  {}",
                    name.bold(),
                    file.permissions,
                    file.content.len(),
                    file.path
                );
            }
        }
        OutputMode::Json => {
            let resources: Vec<Value> = store
                .iter()
                .map(|(name, file)| {
                    json!({
                        "name": name,
                        "path": file.path,
                        "permissions": file.permissions,
                        "size": file.content.len(),
                        "content_sha256": LogEntry::fingerprint(&file.content),
                    })
                })
                .collect();
            write_json_line(&json!({
                "command": "show",
                "state_file": config.paths.state_file.to_string_lossy(),
                "resources": resources,
            }))?;
        }
    }
    Ok(())
}

fn run_schema(cli: &Cli) -> Result<(), CliError> {
    let schema = sticky_file_schema();
    match output_mode(cli) {
        OutputMode::Human => {
            println!("{} (provider {:?})", schema.resource_type.bold(), schema.provider);
            println!("  {}", schema.description);
            for attr in &schema.attributes {
                let mut flags = Vec::new();
                if attr.required {
                    flags.push("required");
                }
                if attr.optional {
                    flags.push("optional");
                }
                if attr.computed {
                    flags.push("computed");
                }
                if attr.requires_replace {
                    flags.push("forces replacement");
                }
                println!(
                    "  {:<12} {:<7} [{}] {}",
                    attr.name.bold(),
                    attr.kind,
                    flags.join(", "),
                    attr.description
                );
                for line in attr.validators.iter().chain(&attr.plan_modifiers) {
                    println!("      {}", line.dimmed());
                }
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "schema",
                "schema": serde_json::to_value(&schema)?,
            }))?;
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match load_config(cli) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": false,
                            "error": e.to_string(),
                        }))?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ──────────────────── output ────────────────────

fn outcome_error(report: &RunReport) -> Result<(), CliError> {
    if !report.failed() {
        return Ok(());
    }
    let failed = report.failed_count();
    let attempted = report.resources.iter().any(|r| !r.actions.is_empty());
    if attempted {
        Err(CliError::Partial(format!(
            "{}: {failed} of {} resource(s) failed",
            report.command,
            report.resources.len()
        )))
    } else {
        Err(CliError::User(format!(
            "{}: {failed} resource(s) failed validation; nothing was written",
            report.command
        )))
    }
}

fn emit_report(cli: &Cli, report: &RunReport) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            if report.resources.is_empty() {
                println!("{}: nothing to do", report.command);
            }
            for r in &report.resources {
                let planned = r.planned.map_or("-", |p| p.as_str());
                let actions: Vec<&str> = r.actions.iter().map(|a| a.as_str()).collect();
                let status = if r.failed() {
                    "FAIL".red().bold()
                } else {
                    "ok".green()
                };
                println!(
                    "{status:<5} {:<20} {planned:<8} {}",
                    r.name,
                    actions.join(", ")
                );
                print_diagnostics(&r.diagnostics);
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": report.command,
                "ok": !report.failed(),
                "failed": report.failed_count(),
                "resources": report.resources,
            }))?;
        }
    }
    Ok(())
}

fn print_diagnostics(diags: &Diagnostics) {
    for diag in diags {
        if diag.is_error() {
            println!("      {} {}", "error:".red(), diag_line(diag));
        } else {
            println!("      {} {}", "warning:".yellow(), diag_line(diag));
        }
    }
}

fn diag_line(diag: &Diagnostic) -> String {
    let line = match diag.attribute {
        Some(attr) => format!("{} ({attr}): {}", diag.summary, diag.detail),
        None => format!("{}: {}", diag.summary, diag.detail),
    };
    if diag.retryable {
        format!("{line} [retryable]")
    } else {
        line
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("STICKY_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
