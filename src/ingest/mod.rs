//! Ingestion pipeline: fetch → filter → chunk for one repository.
//!
//! Pure data transform over I/O; nothing here persists anything.

pub mod fetcher;
pub mod filter;

use std::time::Instant;

use crate::chunking;
use crate::error::Error;
use crate::github::{GithubClient, RepoInfo, RepoRef};
use crate::models::{CodeChunk, RawFile, RepoMeta};

/// Phase markers surfaced to the caller for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Fetched,
    Filtered,
    Chunked,
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct IngestStats {
    pub files_fetched: usize,
    pub files_accepted: usize,
    pub files_rejected: usize,
    pub chunk_count: usize,
    pub fetch_ms: u64,
    pub filter_ms: u64,
    pub chunk_ms: u64,
    pub used_clone_fallback: bool,
}

#[derive(Debug)]
pub struct IngestOutput {
    pub repo_id: String,
    pub meta: RepoMeta,
    pub chunks: Vec<CodeChunk>,
    pub stats: IngestStats,
}

/// Run the full ingestion pipeline for one repository.
///
/// `on_phase` fires after each phase completes so the orchestrator can
/// report progress without the pipeline knowing about the queue.
pub async fn ingest<F>(
    github: &GithubClient,
    repo_ref: &RepoRef,
    info: &RepoInfo,
    clone_token: Option<&str>,
    mut on_phase: F,
) -> Result<IngestOutput, Error>
where
    F: FnMut(IngestPhase),
{
    let repo_id = repo_ref.repo_id();

    // Fetch
    let fetch_started = Instant::now();
    let fetched = fetcher::fetch_repo(github, repo_ref, info, clone_token).await?;
    let fetch_ms = fetch_started.elapsed().as_millis() as u64;
    let files_fetched = fetched.files.len();
    on_phase(IngestPhase::Fetched);

    // Filter
    let filter_started = Instant::now();
    let filtered = filter::filter(fetched.files);
    let filter_ms = filter_started.elapsed().as_millis() as u64;
    for rejected in &filtered.rejected {
        tracing::debug!("filtered out {}: {}", rejected.path, rejected.reason);
    }
    let files_accepted = filtered.accepted.len();
    let files_rejected = filtered.rejected.len();
    on_phase(IngestPhase::Filtered);

    // Chunk (CPU-bound; parsing large repos off the async threads)
    let chunk_started = Instant::now();
    let repo_id_for_chunks = repo_id.clone();
    let accepted = filtered.accepted;
    let chunks = tokio::task::spawn_blocking(move || chunk_files(&repo_id_for_chunks, &accepted))
        .await
        .map_err(|e| Error::TransientIo(format!("chunking task panicked: {e}")))?;
    let chunk_ms = chunk_started.elapsed().as_millis() as u64;
    on_phase(IngestPhase::Chunked);

    tracing::info!(
        "{repo_id}: {files_fetched} fetched, {files_accepted} accepted, {} chunks",
        chunks.len()
    );

    Ok(IngestOutput {
        repo_id,
        stats: IngestStats {
            files_fetched,
            files_accepted,
            files_rejected,
            chunk_count: chunks.len(),
            fetch_ms,
            filter_ms,
            chunk_ms,
            used_clone_fallback: fetched.meta.used_fallback,
        },
        meta: fetched.meta,
        chunks,
    })
}

/// Chunk every accepted file, preserving file order.
pub fn chunk_files(repo_id: &str, files: &[RawFile]) -> Vec<CodeChunk> {
    let mut chunks = Vec::new();
    for file in files {
        let result = chunking::chunk_file(repo_id, &file.path, &file.content);
        tracing::debug!(
            "{}: {} chunks via {}",
            file.path,
            result.chunks.len(),
            result.strategy.as_str()
        );
        chunks.extend(result.chunks);
    }
    chunks
}
