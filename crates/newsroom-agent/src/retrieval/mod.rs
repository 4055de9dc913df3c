//! Retrieval adapters for news sources.
//!
//! Each adapter wraps one external search backend and normalizes its hits
//! into [`NewsItem`]s. Adapters never retry and never swallow errors; that
//! is the job of [`crate::retry`].

mod financial;
mod general;

pub use financial::{FinancialNewsAdapter, YAHOO_SEARCH_URL};
pub use general::{DUCKDUCKGO_URL, GeneralSearchAdapter};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// News Item
// ─────────────────────────────────────────────────────────────────────────────

/// Which kind of backend produced a [`NewsItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsSource {
    /// General web/news search.
    General,
    /// Financial news search.
    Financial,
}

/// A normalized retrieval record. `link` identifies the item across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    pub link: String,
    pub query: String,
    pub source: NewsSource,
}

/// The `{title, description}` projection sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsDigest {
    pub title: String,
    pub description: String,
}

impl From<&NewsItem> for NewsDigest {
    fn from(item: &NewsItem) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of a single adapter call.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Connection, TLS, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The backend answered but the payload was not understood.
    #[error("parse error: {0}")]
    Parse(String),
}

impl RetrievalError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A single news backend.
#[async_trait]
pub trait RetrievalAdapter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Search for news. An empty result is not an error.
    async fn search(&self, input: &str) -> Result<Vec<NewsItem>, RetrievalError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Client
// ─────────────────────────────────────────────────────────────────────────────

/// Settings shared by the HTTP adapters.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Maximum items each adapter returns.
    pub max_results: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            timeout: Duration::from_secs(15),
            // Both backends reject obviously non-browser agents.
            user_agent: concat!(
                "Mozilla/5.0 (X11; Linux x86_64) newsroom/",
                env!("CARGO_PKG_VERSION")
            )
            .to_string(),
        }
    }
}

impl RetrievalConfig {
    /// Build the HTTP client the adapters share.
    pub fn build_client(&self) -> Result<Client, RetrievalError> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?)
    }
}

/// Send a GET and fail on non-2xx.
pub(crate) async fn get_checked(
    client: &Client,
    url: &str,
) -> Result<reqwest::Response, RetrievalError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RetrievalError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_item_serialization() {
        let item = NewsItem {
            title: "Chip shortage eases".into(),
            description: "Supply recovers".into(),
            content: None,
            link: "https://example.com/a".into(),
            query: "chip shortage".into(),
            source: NewsSource::General,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["source"], "general");
        assert!(json["content"].is_null());

        let digest = serde_json::to_value(NewsDigest::from(&item)).unwrap();
        assert_eq!(
            digest,
            serde_json::json!({"title": "Chip shortage eases", "description": "Supply recovers"})
        );
    }

    #[test]
    fn test_retrieval_error_display() {
        let err = RetrievalError::Status {
            status: 503,
            url: "https://example.com".into(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://example.com");
        assert!(RetrievalError::parse("no vqd").to_string().contains("no vqd"));
    }

    #[test]
    fn test_default_config_builds_client() {
        let config = RetrievalConfig::default();
        assert_eq!(config.max_results, 5);
        assert!(config.build_client().is_ok());
    }
}
