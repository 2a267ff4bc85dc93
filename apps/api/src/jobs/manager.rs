//! Job Lifecycle Manager: the only code that mutates job records.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::document::{AssemblyError, DocumentAssembler, OutputArtifact, DOCUMENT_TITLE};
use crate::generation::{GenerationError, GenerationService};
use crate::jobs::{JobBackend, JobError, JobRecord, JobState, JobStatus, JobTask};

const FALLBACK_UPLOAD_NAME: &str = "upload.pdf";
/// Store writes of a state transition are tried this many times.
const SAVE_ATTEMPTS: u32 = 3;
const SAVE_BACKOFF: Duration = Duration::from_millis(100);

/// Why a job ended in Failed.
#[derive(Debug, Error)]
enum ProcessingError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

#[derive(Clone)]
pub struct JobManager {
    backend: Arc<dyn JobBackend>,
    generator: Arc<dyn GenerationService>,
    assembler: DocumentAssembler,
    upload_dir: PathBuf,
}

impl JobManager {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        generator: Arc<dyn GenerationService>,
        assembler: DocumentAssembler,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            generator,
            assembler,
            upload_dir: upload_dir.into(),
        }
    }

    /// Persists the upload, records the job as Pending and queues it.
    /// If the upload cannot be written no job is created.
    pub async fn submit(
        &self,
        file_name: &str,
        contents: &[u8],
        question_count: u32,
    ) -> Result<Uuid, JobError> {
        let record = self.register(file_name, contents, question_count).await?;

        if let Err(e) = self.backend.enqueue(&record.task()).await {
            error!(job_id = %record.id, "Failed to enqueue job: {e}");
            let mut record = record;
            record.fail(format!("Failed to enqueue job: {e}"))?;
            // best effort: the caller sees the enqueue error either way
            if let Err(save_err) = self.save_with_retry(&record).await {
                warn!(job_id = %record.id, "Could not record enqueue failure: {save_err}");
            }
            return Err(e);
        }

        info!(job_id = %record.id, question_count, "Job queued");
        Ok(record.id)
    }

    /// Registers a job and runs it to completion in the caller's task.
    pub async fn run_inline(
        &self,
        file_name: &str,
        contents: &[u8],
        question_count: u32,
    ) -> Result<(Uuid, JobStatus), JobError> {
        let record = self.register(file_name, contents, question_count).await?;
        info!(job_id = %record.id, question_count, "Running job inline");
        let finished = self.process(&record.task()).await?;
        Ok((finished.id, finished.status()))
    }

    /// Current status; ids the store does not know are reported as unknown.
    pub async fn poll(&self, id: Uuid) -> Result<JobStatus, JobError> {
        Ok(self
            .backend
            .load(id)
            .await?
            .map(|record| record.status())
            .unwrap_or_else(JobStatus::unknown))
    }

    /// Path of the artifact of a completed job, or `None` if the job is
    /// unknown or has not completed.
    pub async fn artifact_path(&self, id: Uuid) -> Result<Option<PathBuf>, JobError> {
        let record = self.backend.load(id).await?;
        Ok(record
            .filter(|r| r.state == JobState::Completed)
            .and_then(|r| r.output_file)
            .map(|name| self.assembler.artifact_path(&name)))
    }

    /// Takes one task off the queue and runs it. Returns `false` if the queue
    /// stayed empty for `wait`.
    pub async fn process_next(&self, wait: Duration) -> Result<bool, JobError> {
        let Some(task) = self.backend.dequeue(wait).await? else {
            return Ok(false);
        };
        self.process(&task).await?;
        Ok(true)
    }

    /// Runs one task through Running to a terminal state and returns the
    /// final record. Tasks for jobs already terminal are skipped.
    ///
    /// The task has left the queue by now, so a transition the store keeps
    /// refusing is replaced by a Failed record carrying the store error.
    pub async fn process(&self, task: &JobTask) -> Result<JobRecord, JobError> {
        let pending = self
            .backend
            .load(task.job_id)
            .await?
            .ok_or(JobError::NotFound(task.job_id))?;

        if pending.state.is_terminal() {
            info!(job_id = %pending.id, state = ?pending.state, "Skipping redelivered task");
            return Ok(pending);
        }

        let mut running = pending.clone();
        running.start()?;
        let running = self.persist_or_fail(running, &pending).await?;
        if running.state.is_terminal() {
            return Ok(running);
        }
        info!(job_id = %running.id, "Job started");

        let mut finished = running.clone();
        match self.execute(task).await {
            Ok(artifact) => {
                info!(job_id = %finished.id, path = %artifact.path.display(), "Job completed");
                finished.complete(artifact.name)?;
            }
            Err(e) => {
                finished.fail(e.to_string())?;
                error!(job_id = %finished.id, "Job failed: {e}");
            }
        }

        self.persist_or_fail(finished, &running).await
    }

    /// Stores `record`. If that keeps failing, stores `last_stored` moved to
    /// Failed with the store error instead and returns that.
    async fn persist_or_fail(
        &self,
        record: JobRecord,
        last_stored: &JobRecord,
    ) -> Result<JobRecord, JobError> {
        let err = match self.save_with_retry(&record).await {
            Ok(()) => return Ok(record),
            Err(e) => e,
        };
        error!(job_id = %record.id, state = ?record.state, "Could not store job state: {err}");

        let mut failed = last_stored.clone();
        failed.fail(format!("Failed to record job state: {err}"))?;
        self.save_with_retry(&failed).await?;
        Ok(failed)
    }

    async fn save_with_retry(&self, record: &JobRecord) -> Result<(), JobError> {
        let mut attempt = 1;
        loop {
            match self.backend.save(record).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < SAVE_ATTEMPTS => {
                    let delay = SAVE_BACKOFF * (1 << (attempt - 1));
                    warn!(
                        job_id = %record.id,
                        "Saving job failed (attempt {attempt}), retrying in {}ms: {e}",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute(&self, task: &JobTask) -> Result<OutputArtifact, ProcessingError> {
        let question_count = task.num_questions as usize;
        let source = self.generator.load_source(&task.file_path).await?;
        let output = self.generator.generate(&source, question_count).await?;
        let pairs = output.answer_all(question_count).await;
        Ok(self
            .assembler
            .assemble(task.job_id, DOCUMENT_TITLE, &pairs)
            .await?)
    }

    async fn register(
        &self,
        file_name: &str,
        contents: &[u8],
        question_count: u32,
    ) -> Result<JobRecord, JobError> {
        let id = Uuid::new_v4();
        let source_path = self.store_upload(id, file_name, contents).await?;
        let record = JobRecord::new(id, source_path, question_count);
        self.backend.create(&record).await?;
        Ok(record)
    }

    /// Writes the upload to `<upload_dir>/<job_id>/<sanitized name>`.
    async fn store_upload(
        &self,
        id: Uuid,
        file_name: &str,
        contents: &[u8],
    ) -> Result<PathBuf, JobError> {
        let dir = self.upload_dir.join(id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| JobError::Upload {
                path: dir.clone(),
                source,
            })?;

        let path = dir.join(sanitize_file_name(file_name));
        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| JobError::Upload {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// Keeps the final path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
fn sanitize_file_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        FALLBACK_UPLOAD_NAME.to_string()
    } else {
        cleaned
    }
}
