//! Financial news search backed by Yahoo Finance.
//!
//! Yahoo's search endpoint only returns headlines and links, so each story
//! page is fetched and its metadata read directly. Pages that do not mention
//! the entity in their title or description are dropped; the upstream
//! search is fuzzy and returns plenty of unrelated stories.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::{NewsItem, NewsSource, RetrievalAdapter, RetrievalConfig, RetrievalError, get_checked};

/// Default Yahoo Finance search endpoint.
pub const YAHOO_SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";

const NO_TITLE: &str = "No title found.";
const NO_DESCRIPTION: &str = "No description found.";

/// Ticker / company news search.
#[derive(Debug, Clone)]
pub struct FinancialNewsAdapter {
    client: Client,
    search_url: String,
    max_results: usize,
}

impl FinancialNewsAdapter {
    /// Create an adapter against the public Yahoo Finance endpoint.
    pub fn new(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        Ok(Self {
            client: config.build_client()?,
            search_url: YAHOO_SEARCH_URL.to_string(),
            max_results: config.max_results,
        })
    }

    /// Use a different search endpoint.
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    async fn story_links(&self, entity: &str) -> Result<Vec<String>, RetrievalError> {
        let url = format!(
            "{}?q={}&quotesCount=0&newsCount={}&enableFuzzyQuery=false",
            self.search_url,
            urlencoding::encode(entity),
            self.max_results
        );
        let data: Value = get_checked(&self.client, &url)
            .await?
            .json()
            .await
            .map_err(|e| RetrievalError::parse(format!("search response: {}", e)))?;
        parse_story_links(&data)
    }
}

#[async_trait]
impl RetrievalAdapter for FinancialNewsAdapter {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn search(&self, entity: &str) -> Result<Vec<NewsItem>, RetrievalError> {
        let entity = entity.to_lowercase();
        tracing::debug!(entity = %entity, "yahoo finance news search");

        let links = self.story_links(&entity).await?;
        if links.is_empty() {
            tracing::warn!(entity = %entity, "yahoo finance: no stories found");
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for link in links {
            let html = get_checked(&self.client, &link).await?.text().await?;
            let page = parse_page(&html);
            if !matches_entity(&page, &entity) {
                tracing::debug!(link = %link, entity = %entity, "dropping unrelated story");
                continue;
            }
            items.push(NewsItem {
                title: page.title,
                description: page.description,
                content: Some(page.content),
                link,
                query: entity.clone(),
                source: NewsSource::Financial,
            });
        }

        if items.is_empty() {
            tracing::warn!(entity = %entity, "yahoo finance: no relevant stories");
        }
        Ok(items)
    }
}

/// Metadata read from a story page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageMeta {
    pub title: String,
    pub description: String,
    pub content: String,
}

/// Links of every `STORY` entry in a search payload.
pub(crate) fn parse_story_links(data: &Value) -> Result<Vec<String>, RetrievalError> {
    if !data.is_object() {
        return Err(RetrievalError::parse("search response is not an object"));
    }
    let Some(news) = data["news"].as_array() else {
        return Ok(Vec::new());
    };
    Ok(news
        .iter()
        .filter(|n| n["type"].as_str() == Some("STORY"))
        .filter_map(|n| n["link"].as_str())
        .map(str::to_string)
        .collect())
}

pub(crate) fn parse_page(html: &str) -> PageMeta {
    let document = Html::parse_document(html);

    let title = select_text(&document, "title")
        .or_else(|| select_attr(&document, r#"meta[property="og:title"]"#, "content"))
        .unwrap_or_else(|| NO_TITLE.to_string());

    let description = select_attr(&document, r#"meta[name="description"]"#, "content")
        .or_else(|| select_attr(&document, r#"meta[property="og:description"]"#, "content"))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let content = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next().map(visible_text))
        .unwrap_or_default();

    PageMeta {
        title,
        description,
        content,
    }
}

pub(crate) fn matches_entity(page: &PageMeta, entity: &str) -> bool {
    let entity = entity.to_lowercase();
    page.title.to_lowercase().contains(&entity) || page.description.to_lowercase().contains(&entity)
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Body text without script/style contents, whitespace collapsed.
fn visible_text(body: ElementRef<'_>) -> String {
    body.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?.value().as_element()?.name();
            (!matches!(parent, "script" | "style" | "noscript")).then_some(&**text)
        })
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
