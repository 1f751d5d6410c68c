//! wavefit - Bayesian border-proximity analysis of terrorism waves
//!
//! The `wavefit` binary handles:
//! - Loading and region-filtering the incident table
//! - Fitting the stacked joint Gaussian model per wave
//! - Rendering the Markdown, JSON or summary report
//! - Validating input and configuration without fitting

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use wf_common::{format_error_human, Error, OutputFormat, Result, StructuredError, SCHEMA_VERSION};
use wf_config::{
    config_json_schema, load_config, validate_config, AnalysisConfig, ConfigSnapshot,
    ResolvedConfig, ValidationError,
};
use wf_core::exit_codes::ExitCode;
use wf_core::log_event;
use wf_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use wf_core::pipeline::CheckReport;
use wf_core::{Analysis, AnalysisOutcome, GridFitter, ModelFitter, RunOptions};
use wf_report::{
    FailureRow, OverviewSection, ReportConfig, ReportData, ReportGenerator, WaveSection,
};

/// wavefit - Do terrorism waves cluster near borders?
#[derive(Parser)]
#[command(name = "wavefit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to analysis.json (falls back to WAVEFIT_CONFIG, then the XDG location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "md")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log line format on stderr
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit every configured wave and write the report (default)
    Run(RunArgs),

    /// Validate the input table and configuration without fitting
    Check(CheckArgs),

    /// Configuration management
    Config(ConfigArgs),
}

/// Input overrides shared by `run` and `check`.
#[derive(Args, Debug, Default)]
struct InputArgs {
    /// Input table (overrides data.path)
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// Region to analyse (overrides data.region)
    #[arg(long)]
    region: Option<String>,

    /// Restrict to a wave key; repeatable
    #[arg(long = "wave", value_name = "KEY")]
    waves: Vec<String>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Write the report here instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write each wave's stacked table as CSV into this directory
    #[arg(long, value_name = "DIR")]
    emit_stacked: Option<PathBuf>,

    /// Stop at the first wave that fails
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration and where it came from
    Show,
    /// Print the JSON schema of analysis.json
    Schema,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::Clean
                }
                _ => ExitCode::ArgsError,
            };
            std::process::exit(code.as_i32());
        }
    };

    let explicit_level = (cli.global.verbose > 0 || cli.global.quiet)
        .then(|| LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet));
    let log_config =
        LogConfig::from_env(explicit_level, cli.global.log_format).with_color(!cli.global.no_color);
    init_logging(&log_config);

    let ctx = LogContext::new(generate_run_id());

    let exit_code = match &cli.command {
        None => run_analysis(&cli.global, &RunArgs::default(), &ctx),
        Some(Commands::Run(args)) => run_analysis(&cli.global, args, &ctx),
        Some(Commands::Check(args)) => run_check(&cli.global, args, &ctx),
        Some(Commands::Config(args)) => match args.command {
            ConfigCommands::Show => run_config_show(&cli.global, &ctx),
            ConfigCommands::Schema => run_config_schema(),
        },
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// run
// ============================================================================

fn run_analysis(global: &GlobalOpts, args: &RunArgs, ctx: &LogContext) -> ExitCode {
    match execute_run(global, args, ctx) {
        Ok(code) => code,
        Err(err) => report_error(global, &err),
    }
}

fn execute_run(global: &GlobalOpts, args: &RunArgs, ctx: &LogContext) -> Result<ExitCode> {
    let started_at = Utc::now();
    let started = Instant::now();

    let resolved = resolve_config(global, ctx)?;
    let config = effective_config(&resolved, &args.input)?;
    let snapshot = ConfigSnapshot::new(&resolved, &config);

    let fitter = GridFitter::new();
    log_event!(
        ctx,
        INFO,
        event_names::RUN_STARTED,
        Stage::Init,
        "Starting analysis",
        config_id = snapshot.short_id(),
        engine = fitter.name(),
        waves = config.waves.len()
    );

    let outcome = Analysis::new(&config, &fitter, ctx.clone())
        .with_options(RunOptions {
            fail_fast: args.fail_fast,
            emit_stacked: args.emit_stacked.clone(),
        })
        .run()?;

    let overview = overview_section(
        ctx,
        &config,
        &snapshot,
        &outcome,
        fitter.name(),
        started_at,
        started.elapsed().as_millis() as u64,
    );
    let data = ReportData::new(
        ReportConfig::new(config.report.title.clone(), config.report.decimals)
            .with_narrative(config.report.narrative),
        overview,
        wave_sections(&outcome),
        outcome.results.failed.iter().map(FailureRow::from).collect(),
    );
    let rendered = ReportGenerator::new(data.config.clone()).generate(&data, global.format)?;
    write_output(args.output.as_deref(), &rendered)?;

    log_event!(
        ctx,
        INFO,
        event_names::REPORT_WRITTEN,
        Stage::Report,
        "Report written",
        format = tracing::field::display(global.format),
        destination = tracing::field::display(
            args.output
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stdout".to_string())
        ),
        bytes = rendered.len()
    );

    Ok(outcome_exit_code(&outcome))
}

/// Clean when every wave fitted, partial when some did, and the first
/// failure's category when none did.
fn outcome_exit_code(outcome: &AnalysisOutcome) -> ExitCode {
    if outcome.all_failed() {
        return outcome
            .results
            .failed
            .first()
            .map(|f| ExitCode::for_category(f.error.category))
            .unwrap_or(ExitCode::FitError);
    }
    if outcome.is_partial() {
        ExitCode::PartialFail
    } else {
        ExitCode::Clean
    }
}

fn overview_section(
    ctx: &LogContext,
    config: &AnalysisConfig,
    snapshot: &ConfigSnapshot,
    outcome: &AnalysisOutcome,
    engine: &str,
    started_at: DateTime<Utc>,
    duration_ms: u64,
) -> OverviewSection {
    OverviewSection {
        run_id: ctx.run_id.clone(),
        started_at,
        duration_ms: Some(duration_ms),
        data_path: outcome.source.clone(),
        region: config.data.region.clone(),
        rows_read: outcome.rows_read,
        rows_in_region: outcome.rows_in_region,
        engine: engine.to_string(),
        likelihood: config.model.likelihood.to_string(),
        credible_level: config.integration.credible_level,
        config_source: snapshot.source.clone(),
        config_id: snapshot.short_id().to_string(),
        waves_requested: config.waves.len(),
        waves_succeeded: outcome.results.succeeded.len(),
        waves_failed: outcome.results.failed.len(),
    }
}

fn wave_sections(outcome: &AnalysisOutcome) -> Vec<WaveSection> {
    outcome
        .results
        .succeeded
        .iter()
        .map(|analysis| WaveSection {
            key: analysis.wave.key.clone(),
            label: analysis.wave.label.clone(),
            description: analysis.wave.description.clone(),
            records: analysis.records,
            stacked_rows: analysis.stacked.len(),
            fit: analysis.fit.clone(),
        })
        .collect()
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<()> {
    let body = rendered.trim_end();
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, format!("{body}\n"))?;
        }
        None => println!("{body}"),
    }
    Ok(())
}

// ============================================================================
// check
// ============================================================================

fn run_check(global: &GlobalOpts, args: &CheckArgs, ctx: &LogContext) -> ExitCode {
    let report = match resolve_config(global, ctx)
        .and_then(|resolved| effective_config(&resolved, &args.input))
        .and_then(|config| {
            let fitter = GridFitter::new();
            Analysis::new(&config, &fitter, ctx.clone()).check()
        }) {
        Ok(report) => report,
        Err(err) => return report_error(global, &err),
    };

    match global.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => return report_error(global, &Error::from(err)),
        },
        _ => print_check_human(&report),
    }

    match report.waves.iter().find_map(|w| w.error.as_ref()) {
        Some(first) => ExitCode::for_category(first.category),
        None => ExitCode::Clean,
    }
}

fn print_check_human(report: &CheckReport) {
    println!(
        "check: {} ({} rows read, {} in region)",
        report.source, report.rows_read, report.rows_in_region
    );
    for wave in &report.waves {
        match &wave.error {
            None => println!(
                "✓ {} ({}): {} records, {} stacked rows",
                wave.key, wave.label, wave.records, wave.stacked_rows
            ),
            Some(err) => println!(
                "✗ {} ({}): [{}] {}",
                wave.key, wave.label, err.code, err.message
            ),
        }
    }
}

// ============================================================================
// config
// ============================================================================

fn run_config_show(global: &GlobalOpts, ctx: &LogContext) -> ExitCode {
    let resolved = match resolve_config(global, ctx) {
        Ok(resolved) => resolved,
        Err(err) => return report_error(global, &err),
    };
    let snapshot = ConfigSnapshot::new(&resolved, &resolved.config);

    let response = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "run_id": ctx.run_id,
        "generated_at": Utc::now().to_rfc3339(),
        "source": {
            "path": snapshot.path,
            "source": snapshot.source,
            "hash": snapshot.config_hash,
            "using_defaults": resolved.path.path.is_none(),
        },
        "config": resolved.config,
    });

    match serde_json::to_string_pretty(&response) {
        Ok(json) => {
            println!("{json}");
            ExitCode::Clean
        }
        Err(err) => report_error(global, &Error::from(err)),
    }
}

fn run_config_schema() -> ExitCode {
    match serde_json::to_string_pretty(&config_json_schema()) {
        Ok(json) => {
            println!("{json}");
            ExitCode::Clean
        }
        Err(err) => {
            eprintln!("{}", format_error_human(&Error::from(err), false));
            ExitCode::InternalError
        }
    }
}

// ============================================================================
// shared helpers
// ============================================================================

fn resolve_config(global: &GlobalOpts, ctx: &LogContext) -> Result<ResolvedConfig> {
    let resolved = load_config(global.config.as_deref()).map_err(config_error)?;
    match &resolved.path.path {
        Some(path) => log_event!(
            ctx,
            INFO,
            event_names::CONFIG_LOADED,
            Stage::Init,
            "Configuration loaded",
            path = tracing::field::display(path.display()),
            source = tracing::field::display(&resolved.path.source)
        ),
        None => log_event!(
            ctx,
            INFO,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "No configuration file found, using built-in defaults"
        ),
    }
    Ok(resolved)
}

fn config_error(err: ValidationError) -> Error {
    match err {
        ValidationError::IoError(message) => Error::Config(message),
        other => Error::InvalidConfig(other.to_string()),
    }
}

/// Apply command-line overrides and re-validate.
fn effective_config(resolved: &ResolvedConfig, input: &InputArgs) -> Result<AnalysisConfig> {
    let mut config = resolved.config.clone();
    if let Some(path) = &input.data {
        config.data.path = path.display().to_string();
    }
    if let Some(region) = &input.region {
        config.data.region = region.clone();
    }
    config
        .select_waves(&input.waves)
        .map_err(Error::UnknownWave)?;
    validate_config(&config).map_err(config_error)?;
    Ok(config)
}

fn report_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    let exit_code = ExitCode::for_error(err);
    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "status": "error",
                "exit_code": exit_code.as_i32(),
                "exit_name": exit_code.code_name(),
                "error": StructuredError::from(err),
            });
            eprintln!("{response}");
        }
        _ => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(err, use_color));
        }
    }
    exit_code
}
