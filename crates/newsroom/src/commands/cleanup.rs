//! Cleanup command - one sweep of orphaned threads.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{Context, open_store};

/// Arguments for the cleanup command.
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Delete ownerless threads older than this (overrides config)
    #[arg(long)]
    pub max_age_secs: Option<u64>,

    /// History database path (overrides config)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Run the cleanup command.
pub async fn run(args: CleanupArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let max_age = args
        .max_age_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| loaded.config.cleanup().orphan_max_age());

    let store = Arc::new(open_store(&loaded.config, args.db.as_deref())?);
    let deleted = newsroom_server::run_cleanup(store, max_age)
        .await
        .ok_or_else(|| anyhow::anyhow!("cleanup failed; see logs for details"))?;

    if ctx.json_output {
        println!("{}", json!({ "deleted": deleted }));
    } else {
        println!("Deleted {} orphaned threads", deleted);
    }
    Ok(())
}
