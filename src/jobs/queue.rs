//! Durable database-backed job queue.
//!
//! Jobs live in the `index_jobs` table. Workers claim with
//! `FOR UPDATE SKIP LOCKED`, which gives at-least-once delivery and lets any
//! number of workers share the queue without coordination. Retried jobs go
//! back to `queued` with a `run_at` in the future.

use chrono::Utc;
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{IndexRepoJobData, IndexRepoJobResult, JobState, JobStatus};

pub const QUEUE_NAME: &str = "index-repo";
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

const BACKOFF_BASE_SECS: u64 = 5;

/// Terminal jobs kept for status polling; older ones are pruned.
const RETAIN_COMPLETED: i64 = 100;
const RETAIN_FAILED: i64 = 50;

/// Delay before retry number `attempt` runs (1-based): 5s, 10s, 20s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    Duration::from_secs(BACKOFF_BASE_SECS * 2u64.pow(attempt - 1))
}

/// A job handed to a worker.
#[derive(Debug)]
pub struct ClaimedJob {
    pub id: Uuid,
    pub data: IndexRepoJobData,
    /// 1-based attempt number including this run
    pub attempt: i32,
    pub max_attempts: i32,
}

#[derive(Clone)]
pub struct JobQueue {
    pool: PgPool,
}

impl JobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue an indexing job; returns its id immediately.
    pub async fn enqueue(&self, data: &IndexRepoJobData) -> Result<Uuid, Error> {
        let id = Uuid::new_v4();
        let payload = serde_json::to_value(data)
            .map_err(|e| Error::Other(anyhow::anyhow!("failed to serialize job payload: {e}")))?;

        sqlx::query(
            "INSERT INTO index_jobs (id, queue, payload, state, max_attempts) \
             VALUES ($1, $2, $3, 'queued', $4)",
        )
        .bind(id)
        .bind(QUEUE_NAME)
        .bind(payload)
        .bind(DEFAULT_MAX_ATTEMPTS)
        .execute(&self.pool)
        .await?;

        tracing::info!("enqueued job {id} for {}", data.github_url);
        Ok(id)
    }

    /// Claim the oldest runnable job, if any, marking it active.
    pub async fn claim(&self) -> Result<Option<ClaimedJob>, Error> {
        let row = sqlx::query(
            "UPDATE index_jobs SET state = 'active', attempts = attempts + 1, updated_at = now() \
             WHERE id = ( \
                 SELECT id FROM index_jobs \
                 WHERE queue = $1 AND state = 'queued' AND run_at <= now() \
                 ORDER BY created_at \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING id, payload, attempts, max_attempts",
        )
        .bind(QUEUE_NAME)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: serde_json::Value = row.get("payload");
        let data: IndexRepoJobData = serde_json::from_value(payload)
            .map_err(|e| Error::Other(anyhow::anyhow!("corrupt job payload: {e}")))?;

        Ok(Some(ClaimedJob {
            id: row.get("id"),
            data,
            attempt: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
        }))
    }

    /// Record phase progress. Failures only warn; progress is advisory.
    pub async fn set_progress(&self, id: Uuid, progress: i16) {
        let result = sqlx::query(
            "UPDATE index_jobs SET progress = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(progress.clamp(0, 100))
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("failed to record progress for job {id}: {e}");
        }
    }

    /// Mark a job completed with its return value.
    pub async fn complete(&self, id: Uuid, result: &IndexRepoJobResult) -> Result<(), Error> {
        let value = serde_json::to_value(result)
            .map_err(|e| Error::Other(anyhow::anyhow!("failed to serialize job result: {e}")))?;

        sqlx::query(
            "UPDATE index_jobs SET state = 'completed', progress = 100, result = $2, \
             fail_reason = NULL, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(value)
        .execute(&self.pool)
        .await?;

        self.prune().await;
        Ok(())
    }

    /// Record a failure: re-queue with backoff while attempts remain and the
    /// error is retriable, otherwise fail terminally.
    pub async fn fail(
        &self,
        job: &ClaimedJob,
        reason: &str,
        retriable: bool,
    ) -> Result<(), Error> {
        let attempt = job.attempt.max(1) as u32;
        if retriable && job.attempt < job.max_attempts {
            let delay = backoff_delay(attempt);
            let run_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();

            tracing::warn!(
                "job {} attempt {}/{} failed, retrying in {delay:?}: {reason}",
                job.id,
                job.attempt,
                job.max_attempts
            );

            sqlx::query(
                "UPDATE index_jobs SET state = 'queued', run_at = $2, fail_reason = $3, \
                 updated_at = now() WHERE id = $1",
            )
            .bind(job.id)
            .bind(run_at)
            .bind(reason)
            .execute(&self.pool)
            .await?;
        } else {
            tracing::error!(
                "job {} failed terminally after {} attempt(s): {reason}",
                job.id,
                job.attempt
            );

            sqlx::query(
                "UPDATE index_jobs SET state = 'failed', fail_reason = $2, updated_at = now() \
                 WHERE id = $1",
            )
            .bind(job.id)
            .bind(reason)
            .execute(&self.pool)
            .await?;

            self.prune().await;
        }
        Ok(())
    }

    /// Whether cancellation was requested for a job.
    pub async fn is_cancel_requested(&self, id: Uuid) -> Result<bool, Error> {
        let row = sqlx::query("SELECT cancel_requested FROM index_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("cancel_requested")).unwrap_or(false))
    }

    /// Flag a job for cancellation; honored at the next phase boundary.
    pub async fn request_cancel(&self, id: Uuid) -> Result<(), Error> {
        sqlx::query(
            "UPDATE index_jobs SET cancel_requested = TRUE, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Look up a job for the status endpoint.
    pub async fn status(&self, id: Uuid) -> Result<JobStatus, Error> {
        let row = sqlx::query(
            "SELECT state, progress, result, fail_reason FROM index_jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::JobUnknown(id))?;

        let state: String = row.get("state");
        let state: JobState = state
            .parse()
            .map_err(|e: String| Error::Other(anyhow::anyhow!(e)))?;

        let result = row
            .get::<Option<serde_json::Value>, _>("result")
            .and_then(|v| serde_json::from_value(v).ok());

        Ok(JobStatus {
            job_id: id,
            state,
            progress: row.get("progress"),
            result,
            fail_reason: row.get("fail_reason"),
        })
    }

    /// Drop terminal jobs beyond the retention windows.
    async fn prune(&self) {
        let result = sqlx::query(
            "DELETE FROM index_jobs WHERE queue = $1 AND state = 'completed' AND id NOT IN ( \
                 SELECT id FROM index_jobs WHERE queue = $1 AND state = 'completed' \
                 ORDER BY updated_at DESC LIMIT $2)",
        )
        .bind(QUEUE_NAME)
        .bind(RETAIN_COMPLETED)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            tracing::warn!("failed to prune completed jobs: {e}");
        }

        let result = sqlx::query(
            "DELETE FROM index_jobs WHERE queue = $1 AND state = 'failed' AND id NOT IN ( \
                 SELECT id FROM index_jobs WHERE queue = $1 AND state = 'failed' \
                 ORDER BY updated_at DESC LIMIT $2)",
        )
        .bind(QUEUE_NAME)
        .bind(RETAIN_FAILED)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            tracing::warn!("failed to prune failed jobs: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_from_five_seconds() {
        assert_eq!(backoff_delay(1), Duration::from_secs(5));
        assert_eq!(backoff_delay(2), Duration::from_secs(10));
        assert_eq!(backoff_delay(3), Duration::from_secs(20));
    }

    #[test]
    fn test_backoff_zero_attempt_clamped() {
        assert_eq!(backoff_delay(0), Duration::from_secs(5));
    }
}
