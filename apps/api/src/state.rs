use crate::config::Config;
use crate::jobs::JobManager;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Owns the job backend, the generation service and the document assembler.
    pub jobs: JobManager,
}
