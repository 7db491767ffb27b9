//! Mediaflow CLI - Command-line interface
//!
//! Resolves titles, estimates release dates and reads wishlists from the
//! command line.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use mediaflow::observability::{init_tracing, LogFormat};

#[derive(Parser)]
#[command(name = "mediaflow")]
#[command(about = "Title resolution and source ingestion for media automation")]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let format = if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty };
    init_tracing(&cli.log_level, format)?;

    commands::handle_command(cli.command, cli.config.as_deref()).await
}
