//! Worker pool: each worker pulls one task at a time off the queue.
//!
//! Shutdown is checked between tasks only; a job that has started always
//! runs to a terminal state.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::jobs::JobManager;

/// How long one dequeue waits before re-checking for shutdown.
const POLL_WAIT: Duration = Duration::from_secs(5);
/// Pause after a store error before trying again.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub fn spawn_workers(
    manager: JobManager,
    concurrency: usize,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..concurrency.max(1))
        .map(|worker_id| {
            let manager = manager.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(worker_loop(worker_id, manager, shutdown, POLL_WAIT))
        })
        .collect()
}

async fn worker_loop(
    worker_id: usize,
    manager: JobManager,
    shutdown: watch::Receiver<bool>,
    wait: Duration,
) {
    info!(worker_id, "Worker started");
    while !*shutdown.borrow() {
        if let Err(e) = manager.process_next(wait).await {
            error!(worker_id, "Worker error: {e}");
            tokio::time::sleep(ERROR_BACKOFF).await;
        }
    }
    info!(worker_id, "Worker stopped");
}
