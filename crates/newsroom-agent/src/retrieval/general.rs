//! General news search backed by DuckDuckGo.
//!
//! DuckDuckGo's news endpoint needs a per-query `vqd` token, which is scraped
//! from the regular search page first.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::Html;
use serde_json::Value;
use std::sync::LazyLock;

use super::{NewsItem, NewsSource, RetrievalAdapter, RetrievalConfig, RetrievalError, get_checked};

/// Default DuckDuckGo origin.
pub const DUCKDUCKGO_URL: &str = "https://duckduckgo.com";

const VQD_PATTERN: &str = r#"vqd=["']?([^"'&\s]+)"#;

static VQD_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(VQD_PATTERN).ok());

/// Free-text news search.
#[derive(Debug, Clone)]
pub struct GeneralSearchAdapter {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl GeneralSearchAdapter {
    /// Create an adapter against the public DuckDuckGo endpoint.
    pub fn new(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        Ok(Self {
            client: config.build_client()?,
            base_url: DUCKDUCKGO_URL.to_string(),
            max_results: config.max_results,
        })
    }

    /// Point the adapter at a different origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_vqd(&self, query: &str) -> Result<String, RetrievalError> {
        let url = format!("{}/?q={}", self.base_url, urlencoding::encode(query));
        let body = get_checked(&self.client, &url).await?.text().await?;
        extract_vqd(&body)
            .ok_or_else(|| RetrievalError::parse(format!("no vqd token for query '{}'", query)))
    }
}

#[async_trait]
impl RetrievalAdapter for GeneralSearchAdapter {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str) -> Result<Vec<NewsItem>, RetrievalError> {
        tracing::debug!(query, "duckduckgo news search");

        let vqd = self.fetch_vqd(query).await?;
        let url = format!(
            "{}/news.js?l=wt-wt&o=json&noamp=1&q={}&vqd={}&p=-1",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&vqd)
        );
        let data: Value = get_checked(&self.client, &url)
            .await?
            .json()
            .await
            .map_err(|e| RetrievalError::parse(format!("news response: {}", e)))?;

        let items = parse_news_results(&data, query, self.max_results)?;
        if items.is_empty() {
            tracing::warn!(query, "duckduckgo: no news found");
        }
        Ok(items)
    }
}

/// Pull the `vqd` token out of a search landing page.
pub(crate) fn extract_vqd(html: &str) -> Option<String> {
    VQD_RE
        .as_ref()?
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Map a `news.js` payload onto news items.
pub(crate) fn parse_news_results(
    data: &Value,
    query: &str,
    max_results: usize,
) -> Result<Vec<NewsItem>, RetrievalError> {
    let results = data["results"]
        .as_array()
        .ok_or_else(|| RetrievalError::parse("news response has no 'results' array"))?;

    Ok(results
        .iter()
        .filter_map(|r| {
            let link = r["url"].as_str().filter(|u| !u.is_empty())?;
            Some(NewsItem {
                title: plain_text(r["title"].as_str().unwrap_or_default()),
                description: plain_text(r["excerpt"].as_str().unwrap_or_default()),
                content: None,
                link: link.to_string(),
                query: query.to_string(),
                source: NewsSource::General,
            })
        })
        .take(max_results)
        .collect())
}

/// Strip inline markup and decode entities.
fn plain_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_vqd_variants() {
        assert!(VQD_RE.is_some());
        assert_eq!(
            extract_vqd(r#"<script>vqd="4-1234567890123";</script>"#).as_deref(),
            Some("4-1234567890123")
        );
        assert_eq!(
            extract_vqd("nrj('/d.js?q=x&vqd=4-99887766&p=1')").as_deref(),
            Some("4-99887766")
        );
        assert_eq!(extract_vqd("<html>nothing here</html>"), None);
    }

    #[test]
    fn test_parse_news_results() {
        let data = json!({
            "results": [
                {
                    "title": "Chip <b>shortage</b> eases",
                    "excerpt": "Foundries &amp; suppliers recover",
                    "url": "https://news.example.com/1",
                    "source": "Example"
                },
                {
                    "title": "No link here",
                    "excerpt": "dropped"
                },
                {
                    "title": "Second",
                    "excerpt": "",
                    "url": "https://news.example.com/2"
                }
            ]
        });

        let items = parse_news_results(&data, "chip shortage", 5).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Chip shortage eases");
        assert_eq!(items[0].description, "Foundries & suppliers recover");
        assert_eq!(items[0].query, "chip shortage");
        assert_eq!(items[0].source, NewsSource::General);
        assert!(items[0].content.is_none());
        assert_eq!(items[1].link, "https://news.example.com/2");
    }

    #[test]
    fn test_parse_news_results_caps_count() {
        let results: Vec<Value> = (0..10)
            .map(|i| json!({"title": "t", "excerpt": "e", "url": format!("https://x/{i}")}))
            .collect();
        let items = parse_news_results(&json!({ "results": results }), "q", 5).unwrap();
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn test_parse_news_results_empty_is_ok() {
        let items = parse_news_results(&json!({"results": []}), "q", 5).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_news_results_rejects_unexpected_shape() {
        let err = parse_news_results(&json!({"error": "rate limited"}), "q", 5).unwrap_err();
        assert!(matches!(err, RetrievalError::Parse(_)));
    }

    #[test]
    fn test_with_base_url() {
        let adapter = GeneralSearchAdapter::new(&RetrievalConfig::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/");
        assert_eq!(adapter.base_url, "http://127.0.0.1:9999");
        assert_eq!(adapter.name(), "duckduckgo");
    }
}
