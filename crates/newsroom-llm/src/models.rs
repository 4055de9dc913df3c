//! The fixed catalog of chat models the agent can be driven by.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::client::Provider;
use crate::error::LlmError;

/// A supported chat model, identified by its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[default]
    #[serde(rename = "llama3.2:latest", alias = "llama3.2")]
    Llama32,
}

impl ModelName {
    /// Every model in the catalog.
    pub fn all() -> [ModelName; 3] {
        [ModelName::Gpt4o, ModelName::Gpt4oMini, ModelName::Llama32]
    }

    /// Identifier sent to the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Gpt4o => "gpt-4o",
            ModelName::Gpt4oMini => "gpt-4o-mini",
            ModelName::Llama32 => "llama3.2:latest",
        }
    }

    /// Which provider serves this model.
    pub fn provider(&self) -> Provider {
        match self {
            ModelName::Gpt4o | ModelName::Gpt4oMini => Provider::OpenAi,
            ModelName::Llama32 => Provider::Ollama,
        }
    }

    /// Whether the model is offered the `respond_directly` tool.
    ///
    /// Only the local model gets it; the hosted models answer
    /// conversational turns without any tool call.
    pub fn supports_direct_response(&self) -> bool {
        matches!(self, ModelName::Llama32)
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelName::all()
            .into_iter()
            .find(|m| m.as_str() == s)
            .or((s == "llama3.2").then_some(ModelName::Llama32))
            .ok_or_else(|| LlmError::Config(format!("Unknown model: {}", s)))
    }
}
