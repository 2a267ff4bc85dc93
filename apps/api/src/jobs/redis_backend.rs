//! Redis-backed job store and queue.
//!
//! Layout under the configured prefix:
//! - `<prefix>:job:<id>`: serialized `JobRecord`, expiring after `result_ttl_secs`
//! - `<prefix>:queue`: list of serialized `JobTask`s (LPUSH / BRPOP)

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{QueueSettings, SerializationFormat};
use crate::jobs::{JobBackend, JobError, JobRecord, JobTask};

pub struct RedisJobBackend {
    client: redis::Client,
    conn: MultiplexedConnection,
    /// Connections reserved for BRPOP, one per concurrently waiting worker.
    blocking: IdleConnections<MultiplexedConnection>,
    settings: QueueSettings,
}

/// Idle connections handed out one caller at a time.
struct IdleConnections<C> {
    idle: Mutex<Vec<C>>,
}

impl<C> IdleConnections<C> {
    fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
        }
    }

    async fn take(&self) -> Option<C> {
        self.idle.lock().await.pop()
    }

    async fn put_back(&self, conn: C) {
        self.idle.lock().await.push(conn);
    }
}

impl RedisJobBackend {
    pub async fn connect(settings: QueueSettings) -> Result<Self, JobError> {
        let client = redis::Client::open(settings.redis_url.as_str())?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        info!("Redis job backend connected (prefix '{}')", settings.key_prefix);
        Ok(Self {
            client,
            conn,
            blocking: IdleConnections::new(),
            settings,
        })
    }

    async fn blocking_connection(&self) -> Result<MultiplexedConnection, JobError> {
        if let Some(conn) = self.blocking.take().await {
            return Ok(conn);
        }
        debug!("Opening a dedicated Redis connection for BRPOP");
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }

    fn job_key(&self, id: Uuid) -> String {
        job_key(&self.settings.key_prefix, id)
    }

    fn queue_key(&self) -> String {
        queue_key(&self.settings.key_prefix)
    }
}

fn job_key(prefix: &str, id: Uuid) -> String {
    format!("{prefix}:job:{id}")
}

fn queue_key(prefix: &str) -> String {
    format!("{prefix}:queue")
}

fn encode<T: Serialize>(format: SerializationFormat, value: &T) -> Result<String, JobError> {
    match format {
        SerializationFormat::Json => Ok(serde_json::to_string(value)?),
    }
}

fn decode<T: DeserializeOwned>(format: SerializationFormat, raw: &str) -> Result<T, JobError> {
    match format {
        SerializationFormat::Json => Ok(serde_json::from_str(raw)?),
    }
}

#[async_trait]
impl JobBackend for RedisJobBackend {
    async fn create(&self, record: &JobRecord) -> Result<(), JobError> {
        let payload = encode(self.settings.serializer, record)?;
        let mut conn = self.conn.clone();
        let created: Option<String> = redis::cmd("SET")
            .arg(self.job_key(record.id))
            .arg(payload)
            .arg("NX")
            .arg("EX")
            .arg(self.settings.result_ttl_secs)
            .query_async(&mut conn)
            .await?;
        match created {
            Some(_) => Ok(()),
            None => Err(JobError::AlreadyExists(record.id)),
        }
    }

    async fn load(&self, id: Uuid) -> Result<Option<JobRecord>, JobError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.job_key(id))
            .query_async(&mut conn)
            .await?;
        raw.map(|r| decode(self.settings.serializer, &r)).transpose()
    }

    async fn save(&self, record: &JobRecord) -> Result<(), JobError> {
        let payload = encode(self.settings.serializer, record)?;
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(self.job_key(record.id))
            .arg(payload)
            .arg("EX")
            .arg(self.settings.result_ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn enqueue(&self, task: &JobTask) -> Result<(), JobError> {
        let payload = encode(self.settings.serializer, task)?;
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(self.queue_key())
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<JobTask>, JobError> {
        // BRPOP blocks its connection, so it must not share the multiplexed one.
        // A connection that errored is dropped rather than reused.
        let mut conn = self.blocking_connection().await?;
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(self.queue_key())
            .arg(wait.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        self.blocking.put_back(conn).await;
        popped
            .map(|(_, payload)| decode(self.settings.serializer, &payload))
            .transpose()
    }
}
