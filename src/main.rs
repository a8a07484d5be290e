// mailsim - email audience simulation client
//
// Submits an email draft to the simulation backend and renders how a
// synthetic audience reacts, streaming progress as it arrives.
//
// Architecture:
// - Client (reqwest): JSON calls plus the streamed `POST /api/simulate`
// - Decoder: reassembles NDJSON records across arbitrary chunk boundaries
// - Run state: one `SimulationRun` per simulation, fed by decoder handlers
// - Providers: backend stream or a seeded local mock behind one trait
// - Recording: raw stream lines saved to disk and replayed offline

mod cli;
mod client;
mod config;
mod decoder;
mod events;
mod logging;
mod models;
mod provider;
mod recording;
mod render;
mod run;
mod util;
mod validate;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Config commands run before anything reads the config file, so a broken
    // file can still be located and reset
    if let Commands::Config { show, reset, path } = cli.command {
        cli::handle_config(show, reset, path);
        return Ok(ExitCode::SUCCESS);
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = Config::from_env();

    // The guard must live until exit so buffered file logs are flushed
    let _log_guard = logging::init(&config.logging, cli.verbose);

    tracing::debug!(
        api_url = %config.api_url,
        provider = config.provider.as_str(),
        "Configuration loaded"
    );

    cli::dispatch(cli.command, &config).await
}
