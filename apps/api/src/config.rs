use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub queue: QueueSettings,
    pub port: u16,
    /// Root of the statically served tree; uploads and artifacts live below it.
    pub static_dir: PathBuf,
    pub processing_mode: ProcessingMode,
    pub role: AppRole,
    pub worker_concurrency: usize,
    pub max_questions: u32,
    pub max_upload_bytes: usize,
    pub rust_log: String,
}

/// Broker settings for the job queue and result store.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub backend: QueueBackend,
    pub redis_url: String,
    /// Namespace for every key the service writes (`<prefix>:job:<id>`, `<prefix>:queue`).
    pub key_prefix: String,
    pub serializer: SerializationFormat,
    /// How long job records survive in the store after their last update.
    pub result_ttl_secs: u64,
}

/// Where job records and the work queue live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Redis,
    /// In-process only; requires `APP_ROLE=all`.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationFormat {
    Json,
}

/// Whether `POST /analyze` hands work to the queue or runs it inside the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    Queue,
    Inline,
}

/// Which halves of the service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRole {
    All,
    Api,
    Worker,
}

impl AppRole {
    pub fn serves_http(self) -> bool {
        matches!(self, AppRole::All | AppRole::Api)
    }

    pub fn runs_workers(self) -> bool {
        matches!(self, AppRole::All | AppRole::Worker)
    }
}

impl FromStr for QueueBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(QueueBackend::Redis),
            "memory" => Ok(QueueBackend::Memory),
            other => bail!("unknown queue backend '{other}' (expected 'redis' or 'memory')"),
        }
    }
}

impl FromStr for SerializationFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SerializationFormat::Json),
            other => bail!("unsupported serialization format '{other}'"),
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "queue" => Ok(ProcessingMode::Queue),
            "inline" => Ok(ProcessingMode::Inline),
            other => bail!("unknown processing mode '{other}' (expected 'queue' or 'inline')"),
        }
    }
}

impl FromStr for AppRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(AppRole::All),
            "api" => Ok(AppRole::Api),
            "worker" => Ok(AppRole::Worker),
            other => bail!("unknown role '{other}' (expected 'all', 'api' or 'worker')"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let max_upload_mb: usize = parse_env("MAX_UPLOAD_MB", 25)?;
        let role: AppRole = parse_env("APP_ROLE", AppRole::All)?;
        let backend: QueueBackend = parse_env("QUEUE_BACKEND", QueueBackend::Redis)?;
        if backend == QueueBackend::Memory && role != AppRole::All {
            bail!("QUEUE_BACKEND=memory only works with APP_ROLE=all");
        }

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            queue: QueueSettings {
                backend,
                redis_url: env_or("REDIS_URL", "redis://127.0.0.1:6379/0"),
                key_prefix: env_or("QUEUE_KEY_PREFIX", "qagen"),
                serializer: parse_env("QUEUE_SERIALIZER", SerializationFormat::Json)?,
                result_ttl_secs: parse_env("JOB_RESULT_TTL_SECS", 86_400)?,
            },
            port: parse_env("PORT", 8080)?,
            static_dir: PathBuf::from(env_or("STATIC_DIR", "static")),
            processing_mode: parse_env("PROCESSING_MODE", ProcessingMode::Queue)?,
            role,
            worker_concurrency: parse_env("WORKER_CONCURRENCY", 2)?,
            max_questions: parse_env("MAX_QUESTIONS", 50)?,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Directory uploaded PDFs are written to, one sub-directory per job.
    pub fn upload_dir(&self) -> PathBuf {
        self.static_dir.join("docs")
    }

    /// Directory generated artifacts are written to, one sub-directory per job.
    pub fn output_dir(&self) -> PathBuf {
        self.static_dir.join("output")
    }

    #[cfg(test)]
    pub fn for_tests(static_dir: PathBuf) -> Self {
        Config {
            anthropic_api_key: "test-key".to_string(),
            queue: QueueSettings {
                backend: QueueBackend::Memory,
                redis_url: "redis://127.0.0.1:6379/0".to_string(),
                key_prefix: "qagen-test".to_string(),
                serializer: SerializationFormat::Json,
                result_ttl_secs: 60,
            },
            port: 0,
            static_dir,
            processing_mode: ProcessingMode::Queue,
            role: AppRole::All,
            worker_concurrency: 1,
            max_questions: 20,
            max_upload_bytes: 1024 * 1024,
            rust_log: "debug".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}
