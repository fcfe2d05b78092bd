use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use repo_rag::api;
use repo_rag::config::Config;
use repo_rag::github::RepoInfoCache;
use repo_rag::jobs::{spawn_workers, WorkerContext};
use repo_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    tracing::info!(
        "Embedding model: {} ({} dims)",
        config.llm.embedding_model,
        config.llm.embedding_dim
    );

    let state = AppState::new(config.clone()).await?;

    spawn_workers(
        WorkerContext {
            config: config.clone(),
            queue: state.queue.clone(),
            store: state.store.clone(),
            embedder: state.embedder.clone(),
            http: state.http_client.clone(),
            repo_info_cache: Arc::new(RepoInfoCache::new(config.cache_ttl_seconds)),
        },
        config.worker_concurrency,
    );

    let app = Router::new()
        .route("/api/index", post(api::index::submit))
        .route("/api/index/status/{job_id}", get(api::index::status))
        .route("/api/rag/query", post(api::query::query))
        .route("/health", get(api::health::health))
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr()).await?;
    tracing::info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
