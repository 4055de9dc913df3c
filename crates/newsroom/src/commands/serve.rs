//! Serve command - runs the HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use newsroom_server::{Server, ServerConfig};

use super::{Context, build_catalog, open_store};

/// Arguments for the serve command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// History database path (overrides config)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = loaded.config;

    let server_section = config.server();
    let cleanup = config.cleanup();
    let bind = match args.bind {
        Some(addr) => addr,
        None => server_section.bind_addr()?,
    };

    let store = Arc::new(open_store(&config, args.db.as_deref())?);
    let catalog = build_catalog(&config)?;
    if catalog.is_empty() {
        anyhow::bail!("No models available; configure Ollama or set OPENAI_API_KEY");
    }

    let server_config = ServerConfig::new(
        server_section.admin_username,
        server_section.admin_password,
    )
    .with_bind_address(bind)
    .with_cleanup(cleanup.enabled)
    .with_cleanup_interval(cleanup.interval())
    .with_orphan_max_age(cleanup.orphan_max_age());

    if !ctx.json_output {
        eprintln!("newsroom listening on http://{}", bind);
        if ctx.verbose {
            let models: Vec<String> = catalog.models().iter().map(|m| m.to_string()).collect();
            eprintln!("models: {}", models.join(", "));
        }
    }

    Server::new(catalog, server_config)
        .with_store(store)
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
            }
        })
        .await?;
    Ok(())
}
