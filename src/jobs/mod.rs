//! Job orchestration: durable queue plus the indexing worker pool.

pub mod queue;
pub mod worker;

pub use queue::{backoff_delay, JobQueue, QUEUE_NAME};
pub use worker::{spawn_workers, WorkerContext};
