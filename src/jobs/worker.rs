//! Bounded worker pool running the indexing pipeline off the durable queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Error;
use crate::github::{parse_github_url, GithubClient, RepoInfoCache};
use crate::ingest::{self, IngestPhase};
use crate::jobs::queue::{ClaimedJob, JobQueue};
use crate::llm::EmbeddingClient;
use crate::models::IndexRepoJobResult;
use crate::store::{VectorStore, WriteOptions};

/// Idle wait between queue polls.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Everything a worker needs; cheap to clone into each task.
#[derive(Clone)]
pub struct WorkerContext {
    pub config: Config,
    pub queue: Arc<JobQueue>,
    pub store: Arc<VectorStore>,
    pub embedder: Arc<EmbeddingClient>,
    pub http: reqwest::Client,
    pub repo_info_cache: Arc<RepoInfoCache>,
}

/// Spawn the worker pool. Each worker claims and runs jobs sequentially;
/// across workers, jobs are independent.
pub fn spawn_workers(ctx: WorkerContext, concurrency: usize) {
    for worker_id in 0..concurrency {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tracing::info!("indexing worker {worker_id} started");
            worker_loop(ctx, worker_id).await;
        });
    }
}

async fn worker_loop(ctx: WorkerContext, worker_id: usize) {
    loop {
        match ctx.queue.claim().await {
            Ok(Some(job)) => {
                let job_id = job.id;
                tracing::info!(
                    "worker {worker_id} picked up job {job_id} (attempt {}/{}): {}",
                    job.attempt,
                    job.max_attempts,
                    job.data.github_url
                );

                match run_job(&ctx, &job).await {
                    Ok(result) => {
                        tracing::info!(
                            "job {job_id} completed: {} via {} ({} chunks)",
                            result.repo_id,
                            result.strategy,
                            result.chunks_written
                        );
                        if let Err(e) = ctx.queue.complete(job_id, &result).await {
                            tracing::error!("failed to mark job {job_id} completed: {e}");
                        }
                    }
                    Err(e) => {
                        if let Err(store_err) =
                            ctx.queue.fail(&job, &e.to_string(), e.is_retriable()).await
                        {
                            tracing::error!("failed to record failure for job {job_id}: {store_err}");
                        }
                    }
                }
            }
            Ok(None) => {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(e) => {
                tracing::error!("worker {worker_id} failed to poll queue: {e}");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// Run all phases of one indexing job.
///
/// Phase failures propagate as errors; the caller decides retry vs terminal
/// failure from the attempts counter. Cancellation is honored between
/// phases; in-flight batch I/O is allowed to finish.
async fn run_job(ctx: &WorkerContext, job: &ClaimedJob) -> Result<IndexRepoJobResult, Error> {
    let started = Instant::now();

    // Phase 1: resolve the repository and its head commit.
    let repo_ref = parse_github_url(&job.data.github_url)?;
    let token = job
        .data
        .github_token
        .clone()
        .or_else(|| ctx.config.github_token.clone());
    let github = GithubClient::new(ctx.http.clone(), token.clone());

    let repo_id = repo_ref.repo_id();
    let info = match ctx.repo_info_cache.get(&repo_id) {
        Some(cached) => cached,
        None => {
            let info = github.repo_metadata(&repo_ref.owner, &repo_ref.repo).await?;
            ctx.repo_info_cache.put(&repo_id, info.clone());
            info
        }
    };
    let commit_hash = github
        .head_commit_sha(&repo_ref.owner, &repo_ref.repo, &info.default_branch)
        .await;
    ctx.queue.set_progress(job.id, 5).await;

    // Phase 2: fetch → filter → chunk.
    ctx.queue.set_progress(job.id, 10).await;
    let on_phase = {
        let queue = ctx.queue.clone();
        let job_id = job.id;
        move |phase: IngestPhase| {
            let progress = match phase {
                IngestPhase::Fetched => 25,
                IngestPhase::Filtered => 30,
                IngestPhase::Chunked => 40,
            };
            let queue = queue.clone();
            tokio::spawn(async move {
                queue.set_progress(job_id, progress).await;
            });
        }
    };
    let output = ingest::ingest(&github, &repo_ref, &info, token.as_deref(), on_phase).await?;
    check_cancelled(ctx, job).await?;

    // Phase 3: an empty corpus is a successful no-op, not a failure.
    if output.chunks.is_empty() {
        tracing::info!("{}: no indexable chunks, skipping", output.repo_id);
        return Ok(IndexRepoJobResult {
            repo_id: output.repo_id,
            strategy: "skipped".to_string(),
            chunks_written: 0,
            total_duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    // Phase 4: embed.
    let embedded = ctx.embedder.embed_chunks(&output.chunks).await?;
    ctx.queue.set_progress(job.id, 80).await;
    check_cancelled(ctx, job).await?;

    // Phase 5: persist under the reindex protocol.
    let write = ctx
        .store
        .write(
            &embedded,
            WriteOptions {
                repo_meta: &output.meta,
                commit_hash,
                embedding_model: ctx.embedder.model().to_string(),
            },
        )
        .await?;
    ctx.queue.set_progress(job.id, 100).await;

    Ok(IndexRepoJobResult {
        repo_id: output.repo_id,
        strategy: write.strategy.as_str().to_string(),
        chunks_written: write.chunks_written,
        total_duration_ms: started.elapsed().as_millis() as u64,
    })
}

async fn check_cancelled(ctx: &WorkerContext, job: &ClaimedJob) -> Result<(), Error> {
    if ctx.queue.is_cancel_requested(job.id).await? {
        return Err(Error::InvalidInput("job cancelled".to_string()));
    }
    Ok(())
}
