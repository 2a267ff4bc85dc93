//! In-process job backend. Records and queue live only as long as the process,
//! so it is only valid when the API and the workers share one process.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::jobs::{JobBackend, JobError, JobRecord, JobTask};

#[derive(Default)]
pub struct MemoryJobBackend {
    records: Mutex<HashMap<Uuid, JobRecord>>,
    queue: Mutex<VecDeque<JobTask>>,
    ready: Notify,
}

impl MemoryJobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn records(&self) -> Vec<JobRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    async fn pop(&self) -> Option<JobTask> {
        self.queue.lock().await.pop_front()
    }
}

#[async_trait]
impl JobBackend for MemoryJobBackend {
    async fn create(&self, record: &JobRecord) -> Result<(), JobError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.id) {
            return Err(JobError::AlreadyExists(record.id));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<JobRecord>, JobError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn save(&self, record: &JobRecord) -> Result<(), JobError> {
        self.records.lock().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn enqueue(&self, task: &JobTask) -> Result<(), JobError> {
        self.queue.lock().await.push_back(task.clone());
        self.ready.notify_one();
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<JobTask>, JobError> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(task) = self.pop().await {
                return Ok(Some(task));
            }
            if tokio::time::timeout_at(deadline, self.ready.notified())
                .await
                .is_err()
            {
                return Ok(self.pop().await);
            }
        }
    }
}
