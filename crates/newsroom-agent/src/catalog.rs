//! One agent per available model.

use std::collections::HashMap;

use newsroom_llm::{LlmClient, ModelName};

use crate::aggregator::Aggregator;
use crate::error::{AgentError, Result};
use crate::graph::{AgentConfig, NewsAgent};

/// The agents a caller can pick between, keyed by model.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: HashMap<ModelName, NewsAgent>,
    default_model: ModelName,
}

impl AgentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an agent for every model whose provider is configured in
    /// `client`. All agents share `aggregator` and take their settings from
    /// `template`, with the model swapped in.
    pub fn from_client(
        client: &LlmClient,
        aggregator: Aggregator,
        template: &AgentConfig,
    ) -> Result<Self> {
        let mut catalog = Self::new();
        for model in client.available_models() {
            let agent = NewsAgent::builder()
                .with_shared_backend(client.backend_for(model)?)
                .with_aggregator(aggregator.clone())
                .with_config(template.clone())
                .with_model(model)
                .build()?;
            catalog = catalog.with_agent(agent);
        }
        tracing::info!(models = ?catalog.models(), "agent catalog ready");
        Ok(catalog)
    }

    pub fn with_agent(mut self, agent: NewsAgent) -> Self {
        self.agents.insert(agent.model(), agent);
        self
    }

    pub fn with_default_model(mut self, model: ModelName) -> Self {
        self.default_model = model;
        self
    }

    pub fn default_model(&self) -> ModelName {
        self.default_model
    }

    /// The agent for `model`, or for the default model when `None`.
    pub fn get(&self, model: Option<ModelName>) -> Result<&NewsAgent> {
        let model = model.unwrap_or(self.default_model);
        self.agents
            .get(&model)
            .ok_or_else(|| AgentError::config(format!("model {model} is not available")))
    }

    /// Available models in catalog order.
    pub fn models(&self) -> Vec<ModelName> {
        ModelName::all()
            .into_iter()
            .filter(|m| self.agents.contains_key(m))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::tests::FakeAdapter;
    use newsroom_llm::{MockBackend, Provider};
    use std::sync::Arc;

    fn aggregator() -> Aggregator {
        Aggregator::new(
            Arc::new(FakeAdapter::new(vec![])),
            Arc::new(FakeAdapter::new(vec![])),
        )
    }

    #[test]
    fn test_from_client_only_configured_providers() {
        let client = LlmClient::default()
            .with_backend(Provider::Ollama, Arc::new(MockBackend::new(vec![])));
        let catalog =
            AgentCatalog::from_client(&client, aggregator(), &AgentConfig::default()).unwrap();

        assert_eq!(catalog.models(), vec![ModelName::Llama32]);
        assert_eq!(catalog.get(None).unwrap().model(), ModelName::Llama32);
        assert!(matches!(
            catalog.get(Some(ModelName::Gpt4o)),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_from_client_all_models() {
        let client = LlmClient::default()
            .with_backend(Provider::Ollama, Arc::new(MockBackend::new(vec![])))
            .with_backend(Provider::OpenAi, Arc::new(MockBackend::new(vec![])));
        let config = AgentConfig::default().with_max_tokens(512);
        let catalog = AgentCatalog::from_client(&client, aggregator(), &config)
            .unwrap()
            .with_default_model(ModelName::Gpt4oMini);

        assert_eq!(catalog.models().len(), 3);
        let agent = catalog.get(None).unwrap();
        assert_eq!(agent.model(), ModelName::Gpt4oMini);
        assert_eq!(agent.config().max_tokens, 512);
        assert_eq!(agent.tools().len(), 1);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = AgentCatalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.get(None).is_err());
    }
}
