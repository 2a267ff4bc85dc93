mod config;
mod document;
mod errors;
mod formatting;
mod generation;
mod jobs;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, QueueBackend};
use crate::document::DocumentAssembler;
use crate::generation::LlmGenerationService;
use crate::jobs::memory::MemoryJobBackend;
use crate::jobs::redis_backend::RedisJobBackend;
use crate::jobs::worker::spawn_workers;
use crate::jobs::{JobBackend, JobManager};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting qagen v{} (role: {:?}, mode: {:?})",
        env!("CARGO_PKG_VERSION"),
        config.role,
        config.processing_mode
    );

    // Initialize job backend
    let backend: Arc<dyn JobBackend> = match config.queue.backend {
        QueueBackend::Redis => Arc::new(RedisJobBackend::connect(config.queue.clone()).await?),
        QueueBackend::Memory => {
            info!("Using in-process job backend; jobs do not survive restarts");
            Arc::new(MemoryJobBackend::new())
        }
    };

    // Initialize LLM client and generation pipeline
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let generator = Arc::new(LlmGenerationService::new(llm));

    let assembler = DocumentAssembler::new(config.output_dir());
    tokio::fs::create_dir_all(assembler.output_dir()).await?;
    tokio::fs::create_dir_all(config.upload_dir()).await?;

    let jobs = JobManager::new(backend, generator, assembler, config.upload_dir());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers = if config.role.runs_workers() {
        info!("Starting {} workers", config.worker_concurrency);
        spawn_workers(jobs.clone(), config.worker_concurrency, shutdown_rx)
    } else {
        Vec::new()
    };

    if config.role.serves_http() {
        let state = AppState {
            config: config.clone(),
            jobs,
        };

        let app = build_router(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
        info!("Listening on {addr}");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_ctrl_c())
            .await?;
    } else {
        wait_for_ctrl_c().await;
    }

    shutdown_tx.send(true).ok();
    for worker in workers {
        worker.await?;
    }
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C.
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown requested");
}
