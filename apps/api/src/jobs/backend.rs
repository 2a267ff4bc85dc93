use std::time::Duration;

use async_trait::async_trait;

use crate::jobs::{JobError, JobRecord, JobTask};

/// Durable job store plus work queue.
///
/// `RedisJobBackend` in production, `MemoryJobBackend` for single-process
/// runs and tests. Carried by `JobManager` as `Arc<dyn JobBackend>`.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Stores a new record. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, record: &JobRecord) -> Result<(), JobError>;

    async fn load(&self, id: uuid::Uuid) -> Result<Option<JobRecord>, JobError>;

    /// Overwrites the record for `record.id`.
    async fn save(&self, record: &JobRecord) -> Result<(), JobError>;

    async fn enqueue(&self, task: &JobTask) -> Result<(), JobError>;

    /// Takes the oldest task, waiting up to `wait` for one to arrive. Each
    /// task is handed to exactly one caller.
    async fn dequeue(&self, wait: Duration) -> Result<Option<JobTask>, JobError>;
}
