//! Commit-versioned persistence of embedded chunks.

use std::time::Instant;

use crate::error::Error;
use crate::models::{EmbeddedChunk, RepoMeta};

use super::{vector_literal, VectorStore};

/// Rows per INSERT statement. Each statement is atomic on its own.
const WRITE_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Stored commit hash matches the incoming one; nothing to do.
    Skipped,
    /// Commit hash changed (or first index): delete all, insert all.
    FullReindex,
    /// No commit hash available: insert-or-update per chunk id.
    Upsert,
}

impl WriteStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteStrategy::Skipped => "skipped",
            WriteStrategy::FullReindex => "full-reindex",
            WriteStrategy::Upsert => "upsert",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteOptions<'a> {
    pub repo_meta: &'a RepoMeta,
    pub commit_hash: Option<String>,
    pub embedding_model: String,
}

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub strategy: WriteStrategy,
    pub chunks_written: usize,
    pub chunks_deleted: usize,
    pub duration_ms: u64,
}

/// Pick the write strategy from the stored and incoming commit hashes.
pub fn decide_strategy(stored: Option<&str>, incoming: Option<&str>) -> WriteStrategy {
    match incoming {
        Some(commit) if stored == Some(commit) => WriteStrategy::Skipped,
        Some(_) => WriteStrategy::FullReindex,
        None => WriteStrategy::Upsert,
    }
}

impl VectorStore {
    /// Persist embedded chunks under the reindex protocol.
    ///
    /// The `repo_index` row is only touched after every chunk write has
    /// succeeded, so a crash mid-write leaves a state the next reindex
    /// repairs rather than a record that lies about its contents.
    pub async fn write(
        &self,
        embedded: &[EmbeddedChunk],
        opts: WriteOptions<'_>,
    ) -> Result<WriteResult, Error> {
        let started = Instant::now();
        let repo_id = &opts.repo_meta.repo_id;

        let existing = self.repo_index(repo_id).await?;
        let strategy = decide_strategy(
            existing.as_ref().and_then(|r| r.commit_hash.as_deref()),
            opts.commit_hash.as_deref(),
        );

        let mut chunks_deleted = 0usize;
        let mut chunks_written = 0usize;

        match strategy {
            WriteStrategy::Skipped => {
                tracing::info!("{repo_id} already indexed at {:?}, skipping", opts.commit_hash);
            }
            WriteStrategy::FullReindex => {
                let deleted = sqlx::query("DELETE FROM code_chunks WHERE repo_id = $1")
                    .bind(repo_id)
                    .execute(&self.pool)
                    .await?;
                chunks_deleted = deleted.rows_affected() as usize;

                chunks_written = self.insert_chunks(embedded, false).await?;
                self.upsert_repo_index(&opts, embedded.len()).await?;
            }
            WriteStrategy::Upsert => {
                chunks_written = self.insert_chunks(embedded, true).await?;
                self.upsert_repo_index(&opts, embedded.len()).await?;
            }
        }

        Ok(WriteResult {
            strategy,
            chunks_written,
            chunks_deleted,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Insert chunks in batches of `WRITE_BATCH_SIZE` rows per statement.
    ///
    /// `update_on_conflict = false` uses `ON CONFLICT DO NOTHING` (the
    /// full-reindex pre-delete makes conflicts impossible in the common
    /// case); `true` refreshes content, embedding, and timestamp per id.
    async fn insert_chunks(
        &self,
        embedded: &[EmbeddedChunk],
        update_on_conflict: bool,
    ) -> Result<usize, Error> {
        let mut written = 0usize;

        for batch in embedded.chunks(WRITE_BATCH_SIZE) {
            let mut qb = sqlx::QueryBuilder::new(
                "INSERT INTO code_chunks \
                 (id, repo_id, file_path, language, content, start_line, end_line, \
                  symbol_name, chunk_index, embedding, embedded_at) ",
            );

            qb.push_values(batch, |mut row, e| {
                let c = &e.chunk;
                row.push_bind(&c.id)
                    .push_bind(&c.repo_id)
                    .push_bind(&c.file_path)
                    .push_bind(&c.language)
                    .push_bind(&c.content)
                    .push_bind(c.start_line as i32)
                    .push_bind(c.end_line as i32)
                    .push_bind(&c.symbol_name)
                    .push_bind(c.chunk_index as i32)
                    .push_bind(vector_literal(&e.embedding))
                    .push_unseparated("::vector")
                    .push_bind(e.embedded_at);
            });

            if update_on_conflict {
                qb.push(
                    " ON CONFLICT (id) DO UPDATE SET \
                     content = EXCLUDED.content, \
                     embedding = EXCLUDED.embedding, \
                     embedded_at = EXCLUDED.embedded_at",
                );
            } else {
                qb.push(" ON CONFLICT (id) DO NOTHING");
            }

            qb.build().execute(&self.pool).await?;
            written += batch.len();
        }

        Ok(written)
    }

    async fn upsert_repo_index(
        &self,
        opts: &WriteOptions<'_>,
        chunk_count: usize,
    ) -> Result<(), Error> {
        let meta = opts.repo_meta;
        sqlx::query(
            "INSERT INTO repo_index \
             (repo_id, commit_hash, default_branch, size_kb, file_count, \
              chunk_count, embedding_model, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now()) \
             ON CONFLICT (repo_id) DO UPDATE SET \
             commit_hash = EXCLUDED.commit_hash, \
             default_branch = EXCLUDED.default_branch, \
             size_kb = EXCLUDED.size_kb, \
             file_count = EXCLUDED.file_count, \
             chunk_count = EXCLUDED.chunk_count, \
             embedding_model = EXCLUDED.embedding_model, \
             updated_at = now()",
        )
        .bind(&meta.repo_id)
        .bind(&opts.commit_hash)
        .bind(&meta.default_branch)
        .bind(meta.size_kb as i64)
        .bind(meta.file_count as i32)
        .bind(chunk_count as i32)
        .bind(&opts.embedding_model)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
