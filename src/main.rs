//! Boss/Intern - answer questions over a text context by iterative delegation.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use boss_intern::ai::{AiClient, AiError};
use boss_intern::config::{AppConfig, ConfigError, ConfigLoader, TranscriptConfig};
use boss_intern::delegation::{Boss, BossSummary, DelegationError, Intern};
use boss_intern::display;
use boss_intern::suite::{self, SuiteError};
use boss_intern::transcript::{
    ConsoleSink, FanoutSink, NullSink, SqliteTranscript, TranscriptError, TranscriptSink,
};

#[derive(Parser)]
#[command(
    name = "boss-intern",
    about = "Answer questions over a text context by boss/intern delegation",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use this config file instead of the search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not truncate console output.
    #[arg(long, global = true)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question.
    Ask {
        /// The question to answer.
        question: String,
        /// Context text.
        #[arg(long, conflicts_with = "context_file", required_unless_present = "context_file")]
        context: Option<String>,
        /// Read the context from a file.
        #[arg(long)]
        context_file: Option<PathBuf>,
        /// Override the iteration budget.
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Override the maximum depth.
        #[arg(long)]
        max_depth: Option<usize>,
        /// Abort the resolution after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Do not record a transcript.
        #[arg(long)]
        no_transcript: bool,
    },
    /// Run a JSON question suite.
    Suite {
        /// Suite fixture file.
        file: PathBuf,
        /// Write the JSON report here.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the iteration budget.
        #[arg(long)]
        max_iterations: Option<usize>,
    },
    /// Print the effective configuration.
    Config,
    /// Inspect stored transcripts.
    Transcript {
        /// Show the events of one resolution.
        #[arg(long)]
        resolution: Option<Uuid>,
        /// Number of recent resolutions to list.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

/// Errors surfaced by the binary.
#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Delegation(#[from] DelegationError),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Suite(#[from] SuiteError),

    #[error("Failed to read context file {path}: {source}")]
    ContextFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn config_loader(path: Option<PathBuf>) -> ConfigLoader {
    path.map_or_else(ConfigLoader::new, ConfigLoader::with_path)
}

fn credentials(err: AiError) -> ConfigError {
    match err {
        AiError::MissingApiKey(var) => ConfigError::MissingCredentials(var),
        other => ConfigError::Invalid(other.to_string()),
    }
}

/// Build the boss and intern clients. Fails before any question is accepted
/// when credentials are missing.
fn build_boss(config: &AppConfig) -> Result<Boss, AppError> {
    let boss_client = AiClient::from_config(
        &config.ai,
        &config.delegation.boss_model,
        config.ai.boss_temperature,
    )
    .map_err(credentials)?;
    let intern_client = AiClient::from_config(
        &config.ai,
        &config.delegation.intern_model,
        config.ai.intern_temperature,
    )
    .map_err(credentials)?;

    Ok(Boss::new(
        &config.delegation,
        Arc::new(boss_client),
        Intern::new(Arc::new(intern_client)),
    )?)
}

/// Build the transcript sink. Returns whether the console renders events.
async fn build_sink(config: &TranscriptConfig, raw_mode: bool) -> (Arc<dyn TranscriptSink>, bool) {
    if !config.enabled {
        return (Arc::new(NullSink), false);
    }

    let mut fanout = FanoutSink::new();
    if config.console {
        fanout = fanout.with(Arc::new(ConsoleSink::new(raw_mode)));
    }
    if config.store {
        match SqliteTranscript::open(&config.path).await {
            Ok(store) => fanout = fanout.with(Arc::new(store)),
            Err(e) => tracing::warn!(
                error = %e,
                path = %config.path.display(),
                "Transcript store unavailable, continuing without it"
            ),
        }
    }
    (Arc::new(fanout), config.console)
}

#[allow(clippy::too_many_arguments)]
async fn ask(
    mut config: AppConfig,
    raw_mode: bool,
    question: String,
    context: Option<String>,
    context_file: Option<PathBuf>,
    max_iterations: Option<usize>,
    max_depth: Option<usize>,
    timeout_secs: Option<u64>,
    no_transcript: bool,
) -> Result<ExitCode, AppError> {
    if let Some(n) = max_iterations {
        config.delegation.max_iterations = n;
    }
    if let Some(n) = max_depth {
        config.delegation.max_depth = n;
    }
    if no_transcript {
        config.transcript.enabled = false;
    }
    config.validate()?;

    let context = match (context, context_file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| AppError::ContextFile { path, source })?,
        (None, None) => String::new(),
    };

    let (sink, console) = build_sink(&config.transcript, raw_mode).await;
    let boss = build_boss(&config)?.with_sink(sink);
    if console {
        display::print_question_start(&question, &boss.describe(), raw_mode);
    }

    let resolution = boss.answer(&question, &context, 0);
    let result = match timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), resolution).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout_secs = secs, "Resolution timed out");
                display::print_failure(&format!("Timed out after {secs}s"), 0, raw_mode);
                return Ok(ExitCode::FAILURE);
            }
        },
        None => resolution.await,
    };

    match result {
        Ok(outcome) => {
            if !console {
                display::print_final(
                    &outcome.final_answer,
                    Some(outcome.terminated_by),
                    outcome.evidence.len(),
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if !console {
                display::print_failure(&failure.to_string(), failure.evidence.len(), raw_mode);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_suite(
    mut config: AppConfig,
    raw_mode: bool,
    file: PathBuf,
    output: Option<PathBuf>,
    max_iterations: Option<usize>,
) -> Result<ExitCode, AppError> {
    if let Some(n) = max_iterations {
        config.delegation.max_iterations = n;
    }
    config.validate()?;

    let suites = suite::load_suites(&file)?;
    let (sink, _) = build_sink(&config.transcript, raw_mode).await;
    let boss = build_boss(&config)?.with_sink(sink);

    let report = suite::run_suites(&boss, &suites).await;
    display::print_suite_report(&report, raw_mode);
    if let Some(path) = output {
        report.write_to(&path)?;
        tracing::info!(path = %path.display(), "Report written");
    }

    Ok(if report.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn show_config(loader: &ConfigLoader, config: &AppConfig) -> Result<ExitCode, AppError> {
    match loader.find_config_file() {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => {
            println!("# No config file found; searched:");
            for path in loader.search_paths() {
                println!("#   {}", path.display());
            }
        }
    }
    let summary = BossSummary::from(&config.delegation);
    println!(
        "# boss={} intern={} max_iterations={} max_depth={}",
        summary.boss_model, summary.intern_model, summary.max_iterations, summary.max_depth
    );
    println!("{}", toml::to_string_pretty(config)?);
    Ok(ExitCode::SUCCESS)
}

async fn show_transcript(
    config: &AppConfig,
    raw_mode: bool,
    resolution: Option<Uuid>,
    limit: usize,
) -> Result<ExitCode, AppError> {
    let store = SqliteTranscript::open(&config.transcript.path).await?;
    match resolution {
        Some(id) => display::print_events(&store.events_for(id).await?, raw_mode),
        None => display::print_resolutions(&store.recent_resolutions(limit).await?, raw_mode),
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let loader = config_loader(cli.config);
    let config = loader.load()?;

    match cli.command {
        Commands::Ask {
            question,
            context,
            context_file,
            max_iterations,
            max_depth,
            timeout_secs,
            no_transcript,
        } => {
            ask(
                config,
                cli.raw,
                question,
                context,
                context_file,
                max_iterations,
                max_depth,
                timeout_secs,
                no_transcript,
            )
            .await
        }
        Commands::Suite {
            file,
            output,
            max_iterations,
        } => run_suite(config, cli.raw, file, output, max_iterations).await,
        Commands::Config => show_config(&loader, &config),
        Commands::Transcript { resolution, limit } => {
            show_transcript(&config, cli.raw, resolution, limit).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
