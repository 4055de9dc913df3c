//! Provider routing for the model catalog.
//!
//! The [`LlmClient`] owns one backend per configured provider and hands out
//! the backend that serves a given [`ModelName`]. Hosted OpenAI models are
//! only available when an API key was supplied; the local Ollama server is
//! always wired up.
//!
//! # Example
//!
//! ```rust,ignore
//! use newsroom_llm::{LlmClient, LlmClientConfig, ModelName, OpenAiConfig};
//!
//! let client = LlmClient::new(LlmClientConfig::new().with_ollama(OpenAiConfig::ollama()))?;
//! let backend = client.backend_for(ModelName::Llama32)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::SharedBackend;
use crate::error::{LlmError, Result};
use crate::models::ModelName;
use crate::openai::{OpenAiBackend, OpenAiConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Provider Enum
// ─────────────────────────────────────────────────────────────────────────────

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// OpenAI API
    OpenAi,
    /// Local Ollama instance
    Ollama,
}

impl Provider {
    /// Get the string name for this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
        }
    }

    /// Check if this provider requires an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Provider::OpenAi)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the LLM client.
#[derive(Debug, Clone, Default)]
pub struct LlmClientConfig {
    /// OpenAI configuration (absent when no API key is set).
    pub openai: Option<OpenAiConfig>,

    /// Ollama configuration.
    pub ollama: Option<OpenAiConfig>,
}

impl LlmClientConfig {
    /// Create a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure OpenAI backend.
    pub fn with_openai(mut self, config: OpenAiConfig) -> Self {
        self.openai = Some(config);
        self
    }

    /// Configure Ollama backend.
    pub fn with_ollama(mut self, config: OpenAiConfig) -> Self {
        self.ollama = Some(config);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Client
// ─────────────────────────────────────────────────────────────────────────────

/// Backends keyed by provider.
#[derive(Clone, Default)]
pub struct LlmClient {
    backends: HashMap<Provider, SharedBackend>,
}

impl LlmClient {
    /// Create a new client from configuration.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        let mut client = Self::default();

        if let Some(openai_config) = config.openai {
            let backend = OpenAiBackend::new(openai_config)?;
            client = client.with_backend(Provider::OpenAi, Arc::new(backend));
        }

        if let Some(ollama_config) = config.ollama {
            let backend = OpenAiBackend::new(ollama_config)?;
            client = client.with_backend(Provider::Ollama, Arc::new(backend));
        }

        if client.backends.is_empty() {
            return Err(LlmError::Config(
                "No LLM providers configured. Set OPENAI_API_KEY or configure Ollama.".to_string(),
            ));
        }

        Ok(client)
    }

    /// Register (or replace) the backend for a provider.
    pub fn with_backend(mut self, provider: Provider, backend: SharedBackend) -> Self {
        self.backends.insert(provider, backend);
        self
    }

    /// Check if a provider is available.
    pub fn has_provider(&self, provider: Provider) -> bool {
        self.backends.contains_key(&provider)
    }

    /// Models whose provider is configured.
    pub fn available_models(&self) -> Vec<ModelName> {
        ModelName::all()
            .into_iter()
            .filter(|m| self.has_provider(m.provider()))
            .collect()
    }

    /// The backend serving `model`.
    pub fn backend_for(&self, model: ModelName) -> Result<SharedBackend> {
        let provider = model.provider();
        self.backends.get(&provider).cloned().ok_or_else(|| {
            if provider.requires_api_key() {
                LlmError::Config(format!(
                    "Model '{}' needs the {} provider; set OPENAI_API_KEY",
                    model, provider
                ))
            } else {
                LlmError::Config(format!("Provider '{}' is not configured", provider))
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmBackend, MockBackend};

    #[test]
    fn test_provider_name() {
        assert_eq!(Provider::OpenAi.name(), "openai");
        assert_eq!(Provider::Ollama.name(), "ollama");
        assert!(Provider::OpenAi.requires_api_key());
        assert!(!Provider::Ollama.requires_api_key());
    }

    #[test]
    fn test_client_with_ollama_only() {
        let client = LlmClient::new(LlmClientConfig::new().with_ollama(OpenAiConfig::ollama()))
            .unwrap();
        assert!(client.has_provider(Provider::Ollama));
        assert!(!client.has_provider(Provider::OpenAi));
        assert_eq!(client.available_models(), vec![ModelName::Llama32]);
        assert!(client.backend_for(ModelName::Llama32).is_ok());

        let err = client.backend_for(ModelName::Gpt4o).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_client_no_providers_error() {
        let result = LlmClient::new(LlmClientConfig::new());
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    fn test_client_both_providers() {
        let client = LlmClient::new(
            LlmClientConfig::new()
                .with_openai(OpenAiConfig::openai("sk-test"))
                .with_ollama(OpenAiConfig::ollama()),
        )
        .unwrap();
        assert_eq!(client.available_models().len(), 3);
        assert_eq!(client.backend_for(ModelName::Gpt4oMini).unwrap().name(), "openai");
    }

    #[test]
    fn test_with_backend_overrides() {
        let client = LlmClient::default()
            .with_backend(Provider::Ollama, Arc::new(MockBackend::with_text("hi")));
        assert_eq!(client.backend_for(ModelName::Llama32).unwrap().name(), "mock");
    }
}
