//! Redis-backed job queue.
//!
//! Each queue uses three lists and a counter:
//! * `fdp:queue:<name>:wait` holds jobs that have not been picked up. Producers `LPUSH` onto it.
//! * `fdp:queue:<name>:active` holds jobs a worker is processing. Workers move jobs here with `BRPOPLPUSH`, so a job
//!   is never lost between being taken off the wait list and being finished.
//! * `fdp:queue:<name>:failed` holds jobs that ran out of attempts, along with the reason.
//! * `fdp:queue:<name>:id` is incremented to assign job ids.
use futures_util::future::BoxFuture;
use log::*;
use redis::aio::MultiplexedConnection;
use serde::Serialize;

use super::{
    job_types::{JobId, QueueName, QueuedJob},
    queue::{JobConsumer, QueueBackend, QueueError},
};

/// How long a worker blocks on an empty queue before asking again.
const POLL_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
struct QueueKeys {
    wait: String,
    active: String,
    failed: String,
    id: String,
}

impl QueueKeys {
    fn new(name: QueueName) -> Self {
        let prefix = format!("fdp:queue:{name}");
        Self {
            wait: format!("{prefix}:wait"),
            active: format!("{prefix}:active"),
            failed: format!("{prefix}:failed"),
            id: format!("{prefix}:id"),
        }
    }
}

#[derive(Serialize)]
struct FailedJob<'a> {
    job: &'a QueuedJob,
    reason: &'a str,
}

async fn connect(url: &str) -> Result<MultiplexedConnection, QueueError> {
    let client = redis::Client::open(url)?;
    client.get_multiplexed_async_connection().await.map_err(|e| QueueError::ConnectionError(e.to_string()))
}

#[derive(Clone)]
pub struct RedisQueue {
    name: QueueName,
    keys: QueueKeys,
    conn: MultiplexedConnection,
}

impl RedisQueue {
    pub async fn connect(url: &str, name: QueueName) -> Result<Self, QueueError> {
        let conn = connect(url).await?;
        debug!("📦️ Connected to Redis for the {name} queue");
        Ok(Self { name, keys: QueueKeys::new(name), conn })
    }
}

impl QueueBackend for RedisQueue {
    fn name(&self) -> QueueName {
        self.name
    }

    fn add(&self, mut job: QueuedJob) -> BoxFuture<'_, Result<Option<JobId>, QueueError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let id = match job.id {
                Some(id) => id,
                None => {
                    let next: i64 = redis::cmd("INCR").arg(&self.keys.id).query_async(&mut conn).await?;
                    JobId(next)
                },
            };
            job.id = Some(id);
            let raw = serde_json::to_string(&job)?;
            let _len: i64 = redis::cmd("LPUSH").arg(&self.keys.wait).arg(raw).query_async(&mut conn).await?;
            trace!("📦️ Added {} {id} to the {} queue", job.kind, self.name);
            Ok(Some(id))
        })
    }
}

pub struct RedisConsumer {
    name: QueueName,
    keys: QueueKeys,
    conn: MultiplexedConnection,
    /// The serialized form of the job currently being processed, exactly as it sits in the active list
    in_flight: Option<String>,
}

impl RedisConsumer {
    /// Opens a dedicated connection, since the consumer spends most of its time blocked in `BRPOPLPUSH`.
    pub async fn connect(url: &str, name: QueueName) -> Result<Self, QueueError> {
        let conn = connect(url).await?;
        Ok(Self { name, keys: QueueKeys::new(name), conn, in_flight: None })
    }

    async fn remove_in_flight(&mut self) -> Result<(), QueueError> {
        if let Some(raw) = self.in_flight.take() {
            let _removed: i64 =
                redis::cmd("LREM").arg(&self.keys.active).arg(1).arg(raw).query_async(&mut self.conn).await?;
        }
        Ok(())
    }
}

impl JobConsumer for RedisConsumer {
    fn name(&self) -> QueueName {
        self.name
    }

    fn next_job(&mut self) -> BoxFuture<'_, Result<Option<QueuedJob>, QueueError>> {
        Box::pin(async move {
            loop {
                let raw: Option<String> = redis::cmd("BRPOPLPUSH")
                    .arg(&self.keys.wait)
                    .arg(&self.keys.active)
                    .arg(POLL_TIMEOUT_SECS)
                    .query_async(&mut self.conn)
                    .await?;
                let Some(raw) = raw else {
                    continue;
                };
                match serde_json::from_str::<QueuedJob>(&raw) {
                    Ok(job) => {
                        self.in_flight = Some(raw);
                        return Ok(Some(job));
                    },
                    Err(e) => {
                        warn!("📦️ Discarding unreadable entry on the {} queue: {e}", self.name);
                        let _moved: i64 = redis::cmd("LPUSH").arg(&self.keys.failed).arg(&raw).query_async(&mut self.conn).await?;
                        let _removed: i64 =
                            redis::cmd("LREM").arg(&self.keys.active).arg(1).arg(&raw).query_async(&mut self.conn).await?;
                    },
                }
            }
        })
    }

    fn complete(&mut self, _job: &QueuedJob) -> BoxFuture<'_, Result<(), QueueError>> {
        Box::pin(async move { self.remove_in_flight().await })
    }

    fn release(&mut self, _job: &QueuedJob) -> BoxFuture<'_, Result<(), QueueError>> {
        Box::pin(async move { self.remove_in_flight().await })
    }

    fn fail(&mut self, job: &QueuedJob, reason: String) -> BoxFuture<'_, Result<(), QueueError>> {
        let entry = serde_json::to_string(&FailedJob { job, reason: &reason });
        Box::pin(async move {
            let entry = entry?;
            let _len: i64 = redis::cmd("LPUSH").arg(&self.keys.failed).arg(entry).query_async(&mut self.conn).await?;
            self.remove_in_flight().await
        })
    }
}
