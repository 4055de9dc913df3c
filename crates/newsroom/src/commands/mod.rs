//! CLI command handlers.

pub mod ask;
pub mod cleanup;
pub mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use newsroom_agent::{
    AgentCatalog, AgentConfig, Aggregator, FinancialNewsAdapter, GeneralSearchAdapter,
    RetryPolicy,
};
use newsroom_config::{LoadedConfig, NewsroomConfig};
use newsroom_llm::{LlmClient, LlmClientConfig, ModelName, OpenAiConfig};
use newsroom_store::Store;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Explicit config directory.
    pub config_dir: Option<PathBuf>,
}

impl Context {
    /// Discover, merge and validate configuration.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let loaded = newsroom_config::load_config(self.config_dir.as_deref())?;
        for path in loaded.loaded_from() {
            tracing::info!(path = %path.display(), "loaded config");
        }
        if !loaded.env_overrides.is_empty() {
            tracing::debug!(vars = ?loaded.env_overrides, "environment overrides applied");
        }
        Ok(loaded)
    }
}

/// Open the history database, preferring an explicit path.
pub fn open_store(config: &NewsroomConfig, path_override: Option<&Path>) -> Result<Store> {
    let path = path_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.database().resolved_path());
    tracing::info!(path = %path.display(), "opening history database");
    Store::open(&path).with_context(|| format!("Failed to open database at {}", path.display()))
}

/// One agent per model the configured providers can serve.
pub fn build_catalog(config: &NewsroomConfig) -> Result<AgentCatalog> {
    let llm = config.llm();

    let mut client_config = LlmClientConfig::new().with_ollama(
        OpenAiConfig::ollama()
            .with_base_url(&llm.ollama_base_url)
            .with_timeout(llm.timeout()),
    );
    if let Some(key) = llm.openai_api_key.as_deref().filter(|k| !k.is_empty()) {
        let mut openai = OpenAiConfig::openai(key).with_timeout(llm.timeout());
        if let Some(url) = &llm.openai_base_url {
            openai = openai.with_base_url(url);
        }
        client_config = client_config.with_openai(openai);
    }
    let client = LlmClient::new(client_config)?;

    let default_model: ModelName = llm.default_model.parse()?;
    let template = AgentConfig::new(default_model)
        .with_max_tokens(llm.max_tokens)
        .with_temperature(llm.temperature);

    let catalog = AgentCatalog::from_client(&client, build_aggregator(config)?, &template)?
        .with_default_model(default_model);
    if catalog.get(None).is_err() {
        tracing::warn!(model = %default_model, "default model has no configured provider");
    }
    Ok(catalog)
}

fn build_aggregator(config: &NewsroomConfig) -> Result<Aggregator> {
    let retrieval = config.retrieval();
    let adapter_config = newsroom_agent::RetrievalConfig {
        max_results: retrieval.max_results,
        timeout: retrieval.request_timeout(),
        ..Default::default()
    };

    let general = GeneralSearchAdapter::new(&adapter_config)?;
    let financial = FinancialNewsAdapter::new(&adapter_config)?;

    Ok(Aggregator::new(Arc::new(general), Arc::new(financial))
        .with_max_workers(retrieval.max_workers)
        .with_retry_policy(RetryPolicy::new(
            retrieval.max_attempts,
            retrieval.initial_delay(),
        )))
}
