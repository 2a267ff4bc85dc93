//! Job lifecycle: submission, queueing, execution and status reporting.
//!
//! Pending → Running → Completed | Failed, plus Pending → Failed when the
//! task never reaches a worker. Completed and Failed are terminal.

pub mod backend;
pub mod manager;
pub mod memory;
pub mod redis_backend;
#[cfg(test)]
pub mod testing;
pub mod worker;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use backend::JobBackend;
pub use manager::JobManager;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to save upload to {path}: {source}")]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {0} already exists")]
    AlreadyExists(Uuid),

    #[error("Job {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition { id: Uuid, from: JobState, to: JobState },

    #[error("Job store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Job payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Failed)
        )
    }
}

/// Persisted job record, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub state: JobState,
    pub source_path: PathBuf,
    pub question_count: u32,
    /// Artifact name relative to the output directory; set on Completed.
    pub output_file: Option<String>,
    /// Human-readable failure; set on Failed.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(id: Uuid, source_path: PathBuf, question_count: u32) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: JobState::Pending,
            source_path,
            question_count,
            output_file: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: JobState) -> Result<(), JobError> {
        if !self.state.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition(JobState::Running)
    }

    pub fn complete(&mut self, output_file: String) -> Result<(), JobError> {
        self.transition(JobState::Completed)?;
        self.output_file = Some(output_file);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobState::Failed)?;
        let error = error.into();
        self.error = Some(if error.trim().is_empty() {
            "unknown error".to_string()
        } else {
            error
        });
        Ok(())
    }

    pub fn status(&self) -> JobStatus {
        match self.state {
            // Running is not distinguished from Pending for pollers.
            JobState::Pending | JobState::Running => JobStatus::new(StatusLabel::Pending),
            JobState::Completed => JobStatus {
                output_file: self.output_file.clone(),
                ..JobStatus::new(StatusLabel::Completed)
            },
            JobState::Failed => JobStatus {
                error: self.error.clone(),
                ..JobStatus::new(StatusLabel::Failed)
            },
        }
    }

    pub fn task(&self) -> JobTask {
        JobTask {
            job_id: self.id,
            file_path: self.source_path.clone(),
            num_questions: self.question_count,
        }
    }
}

/// Queue payload handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTask {
    pub job_id: Uuid,
    pub file_path: PathBuf,
    pub num_questions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
    Pending,
    Completed,
    Failed,
    Unknown,
}

/// Client-facing view of a job, as returned by `GET /task_status/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub status: StatusLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(status: StatusLabel) -> Self {
        Self {
            status,
            output_file: None,
            error: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new(StatusLabel::Unknown)
    }
}
