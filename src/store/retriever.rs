//! Per-repo cosine-similarity search.

use sqlx::Row;
use std::time::Instant;

use crate::error::Error;
use crate::models::RetrievedChunk;

use super::{vector_literal, VectorStore};

pub const DEFAULT_TOP_K: usize = 8;

/// Candidates scoring below this are dropped before assembly.
pub const MIN_SIMILARITY: f64 = 0.5;

#[derive(Debug)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
    /// Candidates returned by the index before the similarity floor.
    pub total_candidates: usize,
    pub duration_ms: u64,
}

impl VectorStore {
    /// Top-K nearest chunks of one repo by cosine similarity.
    ///
    /// The `ORDER BY embedding <=> $1` form lets Postgres drive the scan
    /// through the HNSW index; the `repo_id` predicate rides on the b-tree
    /// index. Score is `1 - cosine_distance`.
    pub async fn retrieve(
        &self,
        query_embedding: &[f32],
        repo_id: &str,
        top_k: usize,
    ) -> Result<RetrievalResult, Error> {
        let started = Instant::now();
        let query_vec = vector_literal(query_embedding);

        let rows = sqlx::query(
            "SELECT file_path, start_line, end_line, symbol_name, content, language, \
                    1 - (embedding <=> $1::vector) AS score \
             FROM code_chunks \
             WHERE repo_id = $2 \
             ORDER BY embedding <=> $1::vector \
             LIMIT $3",
        )
        .bind(&query_vec)
        .bind(repo_id)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await?;

        let total_candidates = rows.len();

        let chunks = rows
            .into_iter()
            .filter_map(|row| {
                let score: f64 = row.get("score");
                if score < MIN_SIMILARITY {
                    return None;
                }
                Some(RetrievedChunk {
                    file_path: row.get("file_path"),
                    start_line: row.get::<i32, _>("start_line") as usize,
                    end_line: row.get::<i32, _>("end_line") as usize,
                    symbol_name: row.get("symbol_name"),
                    content: row.get("content"),
                    language: row.get("language"),
                    score,
                })
            })
            .collect();

        Ok(RetrievalResult {
            chunks,
            total_candidates,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}
