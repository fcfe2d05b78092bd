//! Vector-capable relational store (Postgres + pgvector).
//!
//! Raw parameterized SQL throughout: ORMs lack native vector-column
//! support, so embeddings are written in pgvector's textual form with an
//! explicit `::vector` cast.

pub mod retriever;
pub mod writer;

pub use retriever::{RetrievalResult, DEFAULT_TOP_K, MIN_SIMILARITY};
pub use writer::{WriteOptions, WriteResult, WriteStrategy};

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::error::Error;
use crate::models::RepoIndex;

pub struct VectorStore {
    pool: PgPool,
    embedding_dim: usize,
}

impl VectorStore {
    /// Connect to Postgres and run the idempotent schema migration.
    pub async fn connect(database_url: &str, embedding_dim: usize) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        let store = Self {
            pool,
            embedding_dim,
        };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create extension, tables, and indexes. Safe to run repeatedly.
    async fn migrate(&self) -> Result<(), Error> {
        let statements = [
            "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
            format!(
                "CREATE TABLE IF NOT EXISTS code_chunks (
                    id TEXT PRIMARY KEY,
                    repo_id TEXT NOT NULL,
                    file_path TEXT NOT NULL,
                    language TEXT NOT NULL,
                    content TEXT NOT NULL,
                    start_line INT NOT NULL,
                    end_line INT NOT NULL,
                    symbol_name TEXT,
                    chunk_index INT NOT NULL,
                    embedding vector({}) NOT NULL,
                    embedded_at TIMESTAMPTZ NOT NULL
                )",
                self.embedding_dim
            ),
            "CREATE INDEX IF NOT EXISTS idx_code_chunks_repo_id
                ON code_chunks (repo_id)"
                .to_string(),
            "CREATE INDEX IF NOT EXISTS idx_code_chunks_embedding
                ON code_chunks USING hnsw (embedding vector_cosine_ops)
                WITH (m = 16, ef_construction = 64)"
                .to_string(),
            "CREATE TABLE IF NOT EXISTS repo_index (
                repo_id TEXT PRIMARY KEY,
                commit_hash TEXT,
                default_branch TEXT NOT NULL,
                size_kb BIGINT NOT NULL,
                file_count INT NOT NULL,
                chunk_count INT NOT NULL,
                embedding_model TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"
            .to_string(),
            "CREATE TABLE IF NOT EXISTS index_jobs (
                id UUID PRIMARY KEY,
                queue TEXT NOT NULL,
                payload JSONB NOT NULL,
                state TEXT NOT NULL DEFAULT 'queued',
                progress SMALLINT NOT NULL DEFAULT 0,
                attempts INT NOT NULL DEFAULT 0,
                max_attempts INT NOT NULL DEFAULT 3,
                run_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                result JSONB,
                fail_reason TEXT,
                cancel_requested BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
            .to_string(),
            "CREATE INDEX IF NOT EXISTS idx_index_jobs_claim
                ON index_jobs (queue, state, run_at)"
                .to_string(),
        ];

        for sql in &statements {
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Load the index record for a repo, if it has ever been indexed.
    pub async fn repo_index(&self, repo_id: &str) -> Result<Option<RepoIndex>, Error> {
        let row = sqlx::query(
            "SELECT repo_id, commit_hash, default_branch, size_kb, file_count,
                    chunk_count, embedding_model, updated_at
             FROM repo_index WHERE repo_id = $1",
        )
        .bind(repo_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RepoIndex {
            repo_id: r.get("repo_id"),
            commit_hash: r.get("commit_hash"),
            default_branch: r.get("default_branch"),
            size_kb: r.get("size_kb"),
            file_count: r.get("file_count"),
            chunk_count: r.get("chunk_count"),
            embedding_model: r.get("embedding_model"),
            updated_at: r.get("updated_at"),
        }))
    }
}

/// Render a vector in pgvector's textual form: `[0.1,0.2,...]`.
pub(crate) fn vector_literal(v: &[f32]) -> String {
    let mut out = String::with_capacity(v.len() * 10 + 2);
    out.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&x.to_string());
    }
    out.push(']');
    out
}
