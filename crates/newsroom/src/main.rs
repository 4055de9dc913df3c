//! Newsroom - conversational news analyst
//!
//! Main entry point for the newsroom CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ask, cleanup, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Newsroom - conversational news analyst
#[derive(Parser)]
#[command(name = "newsroom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config directory (default: ~/.config/newsroom)
    #[arg(long, global = true, env = "NEWSROOM_CONFIG_DIR")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve(serve::ServeArgs),

    /// Ask a one-shot question
    Ask(ask::AskArgs),

    /// Delete orphaned threads from the history database
    Cleanup(cleanup::CleanupArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "newsroom=debug,newsroom_agent=debug,newsroom_llm=debug,newsroom_server=debug,newsroom_store=debug,newsroom_config=debug,info"
    } else {
        "newsroom=info,newsroom_agent=info,newsroom_llm=info,newsroom_server=info,newsroom_store=info,warn"
    };

    let log_dir = cli
        .config
        .clone()
        .or_else(newsroom_config::user_config_dir)
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "newsroom.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "newsroom=trace,newsroom_agent=trace,newsroom_llm=trace,newsroom_server=trace,newsroom_store=trace,newsroom_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir: cli.config,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Ask(args) => ask::run(args, &ctx).await,
        Commands::Cleanup(args) => cleanup::run(args, &ctx).await,
    }
}
