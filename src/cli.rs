// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - simulate: submit a draft and stream the audience reaction
// - audiences / history / health: plain backend queries
// - replay: drive the decoder from a recorded stream file
// - config: show, locate or reset the config file

use crate::client::{ApiClient, ClientError};
use crate::config::{Config, ProviderKind, VERSION};
use crate::decoder::StreamSummary;
use crate::events::{EventHandler, SimulationEvent};
use crate::models::EmailDraft;
use crate::provider::{BackendProvider, MockProvider, ResultProvider};
use crate::recording::{replay_file, Recorder, DEFAULT_REPLAY_CHUNK};
use crate::render::{self, Painter, ProgressReporter};
use crate::run::{RunOutcome, SimulationRun};
use crate::validate::validate_draft;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::future::Future;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Exit code for a draft rejected by validation
const EXIT_INVALID_DRAFT: u8 = 2;

/// Delay between mock progress events so the bar is visible
const MOCK_STEP_DELAY: Duration = Duration::from_millis(150);

/// mailsim - preview how a synthetic audience reacts to an email draft
#[derive(Parser)]
#[command(name = "mailsim")]
#[command(version = VERSION)]
#[command(about = "Preview how a synthetic audience reacts to an email draft", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a simulation for an email draft
    Simulate(SimulateArgs),

    /// List target audiences
    Audiences {
        /// Print raw JSON
        #[arg(long)]
        json: bool,

        /// Include each audience's personas
        #[arg(long)]
        personas: bool,
    },

    /// List, inspect or clear past simulations
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,

        /// Print raw JSON
        #[arg(long)]
        json: bool,

        /// Refresh the list every N seconds until interrupted
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },

    /// Check that the backend is reachable
    Health,

    /// Replay a recorded simulation stream through the decoder
    Replay {
        /// NDJSON file written by `simulate --record`
        file: PathBuf,

        /// Bytes per read, to exercise chunk boundaries
        #[arg(long, default_value_t = DEFAULT_REPLAY_CHUNK)]
        chunk_size: usize,

        /// Print the decoded events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Show one stored simulation
    Show {
        id: String,

        /// Print raw JSON
        #[arg(long)]
        json: bool,

        /// Include persona profiles and reasoning
        #[arg(long)]
        details: bool,
    },

    /// Delete every stored simulation
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct SimulateArgs {
    #[arg(long)]
    pub subject: String,

    #[arg(long)]
    pub body: String,

    /// Call to action (defaults to [draft].cta)
    #[arg(long)]
    pub cta: Option<String>,

    /// Audience identifier (defaults to [draft].audience)
    #[arg(long)]
    pub audience: Option<String>,

    /// Personas to simulate (defaults to [draft].sample_size)
    #[arg(long)]
    pub sample_size: Option<u32>,

    /// Generate a local mock result instead of calling the backend
    #[arg(long)]
    pub mock: bool,

    /// Seed for a reproducible mock result (implies --mock)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Save the raw NDJSON stream to a file
    #[arg(long, value_name = "FILE")]
    pub record: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Include persona profiles and reasoning
    #[arg(long)]
    pub details: bool,

    /// Send the draft without client-side validation
    #[arg(long)]
    pub no_validate: bool,
}

impl SimulateArgs {
    /// Draft from flags, falling back to configured defaults
    fn to_draft(&self, config: &Config) -> EmailDraft {
        EmailDraft {
            subject: self.subject.clone(),
            body: self.body.clone(),
            cta: self.cta.clone().unwrap_or_else(|| config.draft.cta.clone()),
            audience: self
                .audience
                .clone()
                .unwrap_or_else(|| config.draft.audience.clone()),
            sample_size: self.sample_size.unwrap_or(config.draft.sample_size),
        }
    }

    fn use_mock(&self, config: &Config) -> bool {
        self.mock || self.seed.is_some() || config.provider == ProviderKind::Mock
    }
}

/// Run a parsed non-config command
pub async fn dispatch(command: Commands, config: &Config) -> Result<ExitCode> {
    match command {
        Commands::Simulate(args) => handle_simulate(args, config).await,
        Commands::Audiences { json, personas } => handle_audiences(config, json, personas).await,
        Commands::History {
            action: None,
            json,
            watch,
        } => handle_history(config, json, watch).await,
        Commands::History {
            action: Some(HistoryAction::Show { id, json, details }),
            ..
        } => handle_history_show(config, &id, json, details).await,
        Commands::History {
            action: Some(HistoryAction::Clear { yes }),
            ..
        } => handle_history_clear(config, yes).await,
        Commands::Health => handle_health(config).await,
        Commands::Replay {
            file,
            chunk_size,
            json,
        } => handle_replay(&file, chunk_size, json).await,
        Commands::Config { show, reset, path } => {
            handle_config(show, reset, path);
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// simulate
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_simulate(args: SimulateArgs, config: &Config) -> Result<ExitCode> {
    let mut draft = args.to_draft(config);
    if !args.no_validate {
        draft = match validate_draft(&draft) {
            Ok(valid) => valid,
            Err(e) => {
                eprintln!("Invalid draft: {}", e);
                return Ok(ExitCode::from(EXIT_INVALID_DRAFT));
            }
        };
    }

    let recording = match &args.record {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create recording {}", path.display())
        })?)),
        None => None,
    };

    let mut run = SimulationRun::new(draft.clone());
    run.begin();
    let mut handler = (run, ProgressReporter::stderr(draft.sample_size));

    let streamed = if args.use_mock(config) {
        let mut mock = MockProvider::new().with_step_delay(MOCK_STEP_DELAY);
        if let Some(seed) = args.seed {
            mock = mock.with_seed(seed);
        }
        stream_with(&mock, &draft, &mut handler, recording).await
    } else {
        let client = ApiClient::from_config(config)?;
        let backend = BackendProvider::new(client, config.stream_timeout);
        stream_with(&backend, &draft, &mut handler, recording).await
    };

    let (mut run, progress) = handler;
    progress.finish();
    run.finish();

    if let Err(e) = streamed {
        tracing::error!(error = %e, "Simulation transport failed");
        eprintln!("Failed to run simulation. Please ensure the backend is running.");
        eprintln!("  {}", e);
        return Ok(ExitCode::FAILURE);
    }
    eprintln!("{}", render::run_summary(&run));

    if run.late_events() > 0 {
        tracing::warn!(
            late = run.late_events(),
            "Backend sent events after the run ended"
        );
    }

    report_outcome(&run, args.json, args.details)
}

/// Run one provider, teeing raw records to `recording` when given
async fn stream_with<P: ResultProvider, H: EventHandler>(
    provider: &P,
    draft: &EmailDraft,
    handler: &mut H,
    recording: Option<BufWriter<File>>,
) -> Result<StreamSummary, ClientError> {
    tracing::debug!(provider = provider.name(), "Starting simulation");

    let Some(writer) = recording else {
        return provider.run(draft, handler).await;
    };

    let mut recorder = Recorder::new(handler, writer);
    let streamed = provider.run(draft, &mut recorder).await;
    tracing::info!(lines = recorder.lines(), "Simulation stream recorded");
    recorder.finish();
    streamed
}

fn report_outcome(run: &SimulationRun, json: bool, details: bool) -> Result<ExitCode> {
    match run.outcome() {
        RunOutcome::Completed(result) => {
            let mut out = std::io::stdout().lock();
            if json {
                serde_json::to_writer_pretty(&mut out, result)?;
                writeln!(out)?;
            } else {
                render::render_result(&mut out, result, Painter::for_stdout(), details)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Failed(message) => {
            eprintln!("Simulation error: {}", message);
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::Incomplete => {
            eprintln!("Simulation ended without a result");
            Ok(ExitCode::FAILURE)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// replay
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_replay(file: &Path, chunk_size: usize, json: bool) -> Result<ExitCode> {
    if json {
        let mut events: Vec<SimulationEvent> = Vec::new();
        let summary = replay_file(file, chunk_size, &mut events).await?;
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &events)?;
        writeln!(out)?;
        log_summary(&summary);
        return Ok(ExitCode::SUCCESS);
    }

    // The recording carries no draft; the run only needs one for totals
    let mut run = SimulationRun::new(EmailDraft {
        subject: String::new(),
        body: String::new(),
        cta: String::new(),
        audience: String::new(),
        sample_size: 0,
    });
    run.begin();
    let summary = replay_file(file, chunk_size, &mut run).await?;
    run.finish();
    log_summary(&summary);

    report_outcome(&run, false, false)
}

fn log_summary(summary: &StreamSummary) {
    let stats = summary.stats;
    tracing::info!(
        lines = stats.lines,
        dispatched = stats.dispatched,
        blank = stats.blank,
        malformed = stats.malformed,
        unknown = stats.unknown,
        terminal = stats.terminal,
        dropped_tail = summary.dropped_tail.is_some(),
        "Replay finished"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// audiences / history / health
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_audiences(config: &Config, json: bool, personas: bool) -> Result<ExitCode> {
    let client = ApiClient::from_config(config)?;
    let audiences = client
        .list_audiences()
        .await
        .context("Failed to fetch audiences")?;

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &audiences)?;
        writeln!(out)?;
    } else {
        render::render_audiences(&mut out, &audiences, personas, Painter::for_stdout())?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_history(config: &Config, json: bool, watch: Option<u64>) -> Result<ExitCode> {
    let client = ApiClient::from_config(config)?;

    let Some(secs) = watch else {
        print_history(&client, json).await?;
        return Ok(ExitCode::SUCCESS);
    };

    watch_history(&client, json, Duration::from_secs(secs.max(1)), tokio::signal::ctrl_c()).await;
    Ok(ExitCode::SUCCESS)
}

/// Refresh the history every `period` until `stop` resolves
///
/// `stop` is polled during refreshes too, so an interrupt that lands while a
/// request is in flight still ends the loop.
async fn watch_history<F: Future>(
    client: &ApiClient,
    json: bool,
    period: Duration,
    stop: F,
) -> usize {
    let mut ticker = tokio::time::interval(period);
    tokio::pin!(stop);
    let mut refreshes = 0;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = &mut stop => break,
            refreshed = print_history(client, json) => {
                refreshes += 1;
                // A failed refresh is shown and retried on the next tick
                if let Err(e) = refreshed {
                    eprintln!("Error: {:#}", e);
                }
            }
        }
    }
    refreshes
}

async fn print_history(client: &ApiClient, json: bool) -> Result<()> {
    let items = client
        .list_history()
        .await
        .context("Failed to fetch history")?;

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer(&mut out, &items)?;
        writeln!(out)?;
    } else {
        render::render_history(&mut out, &items, Painter::for_stdout())?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

async fn handle_history_show(
    config: &Config,
    id: &str,
    json: bool,
    details: bool,
) -> Result<ExitCode> {
    let client = ApiClient::from_config(config)?;
    let detail = match client.history_detail(id).await {
        Ok(detail) => detail,
        Err(e) if e.is_not_found() => {
            eprintln!("No simulation with id {}", id);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Failed to fetch details"),
    };

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &detail)?;
        writeln!(out)?;
    } else {
        render::render_detail(&mut out, &detail, Painter::for_stdout(), details)?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_history_clear(config: &Config, yes: bool) -> Result<ExitCode> {
    if !yes && !confirm("Delete all stored simulations? [y/N] ")? {
        println!("Aborted.");
        return Ok(ExitCode::SUCCESS);
    }

    let client = ApiClient::from_config(config)?;
    let reply = client
        .clear_history()
        .await
        .context("Failed to clear history")?;
    println!("History cleared ({})", reply.status);
    Ok(ExitCode::SUCCESS)
}

async fn handle_health(config: &Config) -> Result<ExitCode> {
    let client = ApiClient::from_config(config)?;
    match client.health().await {
        Ok(reply) => {
            println!("{} {}", config.api_url, reply.status);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} unreachable: {}", config.api_url, e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{}", prompt);
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

// ─────────────────────────────────────────────────────────────────────────────
// config
// ─────────────────────────────────────────────────────────────────────────────

/// Handle `config`; runs before logging is set up
pub fn handle_config(show: bool, reset: bool, path: bool) {
    if path {
        handle_config_path();
    } else if show {
        handle_config_show();
    } else if reset {
        handle_config_reset();
    } else {
        // No flag provided, show help
        println!("Usage: mailsim config [--show|--reset|--path]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --reset   Reset config file to defaults");
        println!("  --path    Show config file path");
    }
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show() {
    let config = Config::from_env();

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() {
    let Some(path) = Config::config_path() else {
        eprintln!("Error: Could not determine config path");
        std::process::exit(1);
    };

    // Confirm if file exists
    if path.exists() {
        let prompt = format!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        match confirm(&prompt) {
            Ok(true) => {}
            Ok(false) => {
                println!("Aborted.");
                return;
            }
            Err(e) => {
                eprintln!("Error reading confirmation: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            std::process::exit(1);
        }
    }

    // Write the default config (using Config's single source of truth)
    if let Err(e) = std::fs::write(&path, Config::default().to_toml()) {
        eprintln!("Error writing config: {}", e);
        std::process::exit(1);
    }

    println!("Config reset to defaults: {}", path.display());
}
