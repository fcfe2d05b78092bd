use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::jobs::JobQueue;
use crate::llm::EmbeddingClient;
use crate::store::VectorStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<VectorStore>,
    pub queue: Arc<JobQueue>,
    pub embedder: Arc<EmbeddingClient>,
    pub http_client: reqwest::Client,
    pub started_at: Instant,
}

impl AppState {
    /// Connect the store, run migrations, and wire shared clients.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(
            VectorStore::connect(&config.database_url, config.llm.embedding_dim).await?,
        );
        let queue = Arc::new(JobQueue::new(store.pool().clone()));

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let embedder = Arc::new(EmbeddingClient::new(http_client.clone(), config.llm.clone()));

        Ok(Self {
            config,
            store,
            queue,
            embedder,
            http_client,
            started_at: Instant::now(),
        })
    }
}
