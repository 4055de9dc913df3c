//! Tool schemas bound to the model and lenient parsing of their arguments.

use newsroom_llm::{ModelName, ToolDefinition};
use serde_json::{Value, json};

use crate::prompts::{
    ARG_ENTITIES_DESCRIPTION, ARG_QUERY_DESCRIPTION, ARG_RESPONSE_DESCRIPTION,
    NEWS_RETRIEVER_DESCRIPTION, RESPOND_DIRECTLY_DESCRIPTION,
};

pub const NEWS_RETRIEVER: &str = "news_retriever";
pub const RESPOND_DIRECTLY: &str = "respond_directly";

pub fn news_retriever_tool() -> ToolDefinition {
    ToolDefinition::new(
        NEWS_RETRIEVER,
        NEWS_RETRIEVER_DESCRIPTION,
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": ARG_QUERY_DESCRIPTION
                },
                "entities": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": ARG_ENTITIES_DESCRIPTION
                }
            },
            "required": ["query", "entities"]
        }),
    )
}

pub fn respond_directly_tool() -> ToolDefinition {
    ToolDefinition::new(
        RESPOND_DIRECTLY,
        RESPOND_DIRECTLY_DESCRIPTION,
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": ARG_RESPONSE_DESCRIPTION
                }
            },
            "required": ["query"]
        }),
    )
}

/// Tools bound for `model`.
pub fn tools_for(model: ModelName) -> Vec<ToolDefinition> {
    let mut tools = vec![news_retriever_tool()];
    if model.supports_direct_response() {
        tools.push(respond_directly_tool());
    }
    tools
}

/// Arguments of a `news_retriever` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrieverArgs {
    pub query: String,
    pub entities: Vec<String>,
}

impl RetrieverArgs {
    /// Read the arguments without ever failing: a missing query becomes
    /// empty, missing or malformed entities become an empty list.
    pub fn from_value(arguments: &Value) -> Self {
        Self {
            query: string_arg(arguments, "query"),
            entities: entities_arg(arguments.get("entities")),
        }
    }
}

/// Text carried by a `respond_directly` call.
pub fn direct_response(arguments: &Value) -> String {
    string_arg(arguments, "query")
}

fn string_arg(arguments: &Value, key: &str) -> String {
    match arguments.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn entities_arg(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        // Some local models emit the list as a JSON-encoded string.
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(decoded @ Value::Array(_)) => entities_arg(Some(&decoded)),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
