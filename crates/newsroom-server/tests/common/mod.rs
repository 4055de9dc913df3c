//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use newsroom_agent::{
    AgentCatalog, Aggregator, NewsAgent, NewsItem, NewsSource, RetrievalAdapter, RetrievalError,
};
use newsroom_llm::{CompletionResponse, MockBackend, ModelName};
use newsroom_server::{Server, ServerConfig};
use newsroom_store::Store;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "test-password";

/// Adapter that answers every search with the same items.
pub struct FixedAdapter(pub Vec<NewsItem>);

#[async_trait]
impl RetrievalAdapter for FixedAdapter {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(&self, _input: &str) -> Result<Vec<NewsItem>, RetrievalError> {
        Ok(self.0.clone())
    }
}

pub fn news_item(link: &str, source: NewsSource) -> NewsItem {
    NewsItem {
        title: format!("Headline {link}"),
        description: "Summary".to_string(),
        content: None,
        link: link.to_string(),
        query: "test".to_string(),
        source,
    }
}

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// The store the server records into.
    pub store: Arc<Store>,
    shutdown: CancellationToken,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
    /// Temporary directory holding the database.
    pub temp_dir: TempDir,
}

impl TestServer {
    /// Start a server whose model replays `responses` in order.
    pub async fn start_with_responses(responses: Vec<CompletionResponse>) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let store = Arc::new(Store::open(temp_dir.path().join("newsroom.db"))?);

        let aggregator = Aggregator::new(
            Arc::new(FixedAdapter(vec![news_item(
                "https://news.example/general",
                NewsSource::General,
            )])),
            Arc::new(FixedAdapter(vec![news_item(
                "https://finance.example/nvda",
                NewsSource::Financial,
            )])),
        );
        let agent = NewsAgent::builder()
            .with_backend(MockBackend::new(responses))
            .with_aggregator(aggregator)
            .with_model(ModelName::Gpt4o)
            .build()?;
        let catalog = AgentCatalog::new()
            .with_agent(agent)
            .with_default_model(ModelName::Gpt4o);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let config = ServerConfig::new(USERNAME, PASSWORD).with_bind_address(addr);

        let server = Server::new(catalog, config).with_store(store.clone());
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            let _ = server
                .serve(listener, async move { signal.cancelled().await })
                .await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            store,
            shutdown,
            _handle: handle,
            temp_dir,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get an authenticated GET request builder.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url(), path))
            .basic_auth(USERNAME, Some(PASSWORD))
    }

    /// Get an authenticated POST request builder.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url(), path))
            .basic_auth(USERNAME, Some(PASSWORD))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/api/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
