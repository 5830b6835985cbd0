// crates/access-harness-cli/src/main.rs
// ============================================================================
// Module: Access Harness CLI Entry Point
// Description: Command dispatcher for contract runs, plans, and config checks.
// Purpose: Run the access-control contract against a live target from a shell.
// Dependencies: access-harness, clap, serde_json, thiserror, tokio, toml
// ============================================================================

//! ## Overview
//! `access-harness run` executes a suite against the configured target,
//! prints a report, and optionally writes per-run artifacts. `plan` prints the
//! ordered steps without contacting the target, and `config check` validates
//! configuration. Exit codes: 0 when every step passes, 1 when any step fails
//! or is unresolved, 2 for usage, configuration, or output errors.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use access_harness::ContractClient;
use access_harness::HarnessConfig;
use access_harness::RunArtifacts;
use access_harness::RunReport;
use access_harness::ScenarioPlan;
use access_harness::ScenarioRunner;
use access_harness::Suite;
use access_harness::TranscriptEntry;
use access_harness::diagnostics::open_sink;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for usage, configuration, and output errors.
const EXIT_USAGE: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "access-harness", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a suite against the target service.
    Run(RunCommand),
    /// Print the ordered steps of a suite.
    Plan(PlanCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `run`.
#[derive(Args, Debug, Default)]
struct RunCommand {
    /// Path to the config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Target base URL (overrides config and environment).
    #[arg(long = "base-url", value_name = "URL")]
    base_url: Option<String>,
    /// Suite to execute.
    #[arg(long, value_enum)]
    suite: Option<SuiteArg>,
    /// Skip the reachability probe.
    #[arg(long = "no-preflight")]
    no_preflight: bool,
    /// Directory receiving per-run artifacts.
    #[arg(long = "artifacts-dir", value_name = "DIR")]
    artifacts_dir: Option<PathBuf>,
    /// Report format written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `plan`.
#[derive(Args, Debug)]
struct PlanCommand {
    /// Suite to print.
    #[arg(long, value_enum, default_value_t = SuiteArg::Core)]
    suite: SuiteArg,
    /// Omit the reachability probe.
    #[arg(long = "no-preflight")]
    no_preflight: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, then print it with secrets redacted.
    Check(ConfigCheckCommand),
}

/// Arguments for `config check`.
#[derive(Args, Debug)]
struct ConfigCheckCommand {
    /// Path to the config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Suite selection.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum SuiteArg {
    /// Register, login, and the three authorization checks.
    Core,
    /// Core plus negative and symmetry checks.
    Extended,
}

impl From<SuiteArg> for Suite {
    fn from(value: SuiteArg) -> Self {
        match value {
            SuiteArg::Core => Self::Core,
            SuiteArg::Extended => Self::Extended,
        }
    }
}

/// Output formats for reports and plans.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// Markdown.
    Markdown,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(&command).await,
        Commands::Plan(command) => command_plan(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Check(command) => command_config_check(&command),
        },
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `run`.
async fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let mut config = HarnessConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    apply_run_overrides(&mut config, command)?;

    let identities = config
        .identities()
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let client = ContractClient::new(&config.target.base_url, config.request_timeout())
        .map_err(|err| CliError::new(format!("failed to build client: {err}")))?;
    let sink = open_sink(&config.diagnostics)
        .map_err(|err| CliError::new(format!("failed to open diagnostics sink: {err}")))?;
    let plan = ScenarioPlan::for_suite(config.run.suite, config.run.preflight)
        .map_err(|err| CliError::new(format!("invalid scenario plan: {err}")))?;

    let runner = ScenarioRunner::new(client, identities, sink)
        .with_step_timeout(config.step_timeout());
    let report = runner.run(&plan).await;

    let mut stdout = std::io::stdout();
    publish_run(
        &mut stdout,
        &report,
        &runner.client().transcript(),
        command.format,
        config.run.artifacts_dir.as_deref(),
    )?;
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Executes `plan`.
fn command_plan(command: &PlanCommand) -> CliResult<ExitCode> {
    let plan = ScenarioPlan::for_suite(command.suite.into(), !command.no_preflight)
        .map_err(|err| CliError::new(format!("invalid scenario plan: {err}")))?;
    write_stdout(&render_plan(&plan, command.format)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config check`.
fn command_config_check(command: &ConfigCheckCommand) -> CliResult<ExitCode> {
    let config = HarnessConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let rendered = toml::to_string_pretty(&config.redacted())
        .map_err(|err| CliError::new(format!("failed to render config: {err}")))?;
    write_stdout(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Applies command-line overrides on top of file and environment settings.
fn apply_run_overrides(config: &mut HarnessConfig, command: &RunCommand) -> CliResult<()> {
    if let Some(base_url) = &command.base_url {
        config.target.base_url.clone_from(base_url);
    }
    if let Some(suite) = command.suite {
        config.run.suite = suite.into();
    }
    if command.no_preflight {
        config.run.preflight = false;
    }
    if let Some(dir) = &command.artifacts_dir {
        config.run.artifacts_dir = Some(dir.clone());
    }
    config.validate().map_err(|err| CliError::new(format!("invalid arguments: {err}")))
}

/// Prints the report to `out`, then writes artifacts under `artifacts_root`.
///
/// The report is emitted first so an artifact failure cannot hide verdicts.
fn publish_run(
    out: &mut impl Write,
    report: &RunReport,
    transcript: &[TranscriptEntry],
    format: OutputFormat,
    artifacts_root: Option<&Path>,
) -> CliResult<()> {
    out.write_all(render_report(report, format)?.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    if let Some(root) = artifacts_root {
        RunArtifacts::new(run_artifacts_dir(root, report.started_at_ms))
            .and_then(|artifacts| artifacts.write_run(report, transcript))
            .map_err(|err| CliError::new(format!("failed to write artifacts: {err}")))?;
    }
    Ok(())
}

/// Returns the per-run artifact directory under `root`.
fn run_artifacts_dir(root: &Path, started_at_ms: u64) -> PathBuf {
    root.join(format!("run_{started_at_ms}"))
}

/// Renders a run report in the requested format.
fn render_report(report: &RunReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(report.to_text()),
        OutputFormat::Markdown => Ok(report.to_markdown()),
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map(|json| format!("{json}\n"))
            .map_err(|err| CliError::new(format!("failed to render report: {err}"))),
    }
}

/// Renders a plan in the requested format.
fn render_plan(plan: &ScenarioPlan, format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(plan)
            .map(|json| format!("{json}\n"))
            .map_err(|err| CliError::new(format!("failed to render plan: {err}")));
    }
    let markdown = format == OutputFormat::Markdown;
    let mut out = String::new();
    if markdown {
        out.push_str("| # | Step | Depends on | Reads | Writes |\n|---|---|---|---|---|\n");
    }
    for (index, spec) in plan.steps().iter().enumerate() {
        let depends = join_labels(spec.depends_on.iter().map(|step| step.as_str()));
        let reads = join_labels(spec.reads.iter().map(|slot| slot.as_str()));
        let writes = spec.writes.map_or("-", |slot| slot.as_str());
        let position = index + 1;
        if markdown {
            let _ = writeln!(out, "| {position} | {} | {depends} | {reads} | {writes} |", spec.id);
        } else {
            let _ = writeln!(
                out,
                "{position:>2}. {:<34} depends_on={depends} reads={reads} writes={writes}",
                spec.id.as_str()
            );
        }
    }
    Ok(out)
}

/// Joins labels with commas, or `-` when empty.
fn join_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    let joined = labels.collect::<Vec<_>>().join(",");
    if joined.is_empty() { "-".to_string() } else { joined }
}

/// Writes already-terminated text to stdout.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns the usage exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_USAGE)
}
