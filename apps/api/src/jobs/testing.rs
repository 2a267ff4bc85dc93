//! Job backend with injectable store failures, for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::jobs::memory::MemoryJobBackend;
use crate::jobs::{JobBackend, JobError, JobRecord, JobState, JobTask};

pub fn store_error() -> JobError {
    JobError::Store(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection reset by peer",
    )))
}

/// Delegates to `MemoryJobBackend`, failing the calls it is told to fail.
#[derive(Default)]
pub struct FaultyBackend {
    pub inner: MemoryJobBackend,
    /// 1-based `save` calls that fail.
    pub failing_saves: Vec<usize>,
    /// Every save of a record in one of these states fails.
    pub rejected_states: Vec<JobState>,
    pub fail_enqueue: bool,
    pub(crate) saves: AtomicUsize,
}

impl FaultyBackend {
    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBackend for FaultyBackend {
    async fn create(&self, record: &JobRecord) -> Result<(), JobError> {
        self.inner.create(record).await
    }

    async fn load(&self, id: Uuid) -> Result<Option<JobRecord>, JobError> {
        self.inner.load(id).await
    }

    async fn save(&self, record: &JobRecord) -> Result<(), JobError> {
        let call = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_saves.contains(&call) || self.rejected_states.contains(&record.state) {
            return Err(store_error());
        }
        self.inner.save(record).await
    }

    async fn enqueue(&self, task: &JobTask) -> Result<(), JobError> {
        if self.fail_enqueue {
            return Err(store_error());
        }
        self.inner.enqueue(task).await
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<JobTask>, JobError> {
        self.inner.dequeue(wait).await
    }
}
