//! Playwire CLI - Command-line interface
//!
//! Drives the playback negotiation engine against a live server, mostly to
//! see what a server will hand a given player configuration.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use playwire_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "playwire")]
#[command(about = "Negotiate playback with a Jellyfin-style media server")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Write full debug logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.log_file.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    commands::handle_command(cli.command).await
}
