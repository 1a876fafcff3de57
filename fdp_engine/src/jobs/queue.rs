use std::sync::Arc;

use futures_util::future::BoxFuture;
use log::*;
use thiserror::Error;

use super::{
    job_types::{JobId, QueueName, QueuedJob},
    memory::MemoryQueue,
    redis_queue::{RedisConsumer, RedisQueue},
};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Could not connect to the queue backend: {0}")]
    ConnectionError(String),
    #[error("Unsupported queue URL: {0}. Use redis://, rediss:// or memory://")]
    UnsupportedUrl(String),
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),
    #[error("Could not (de)serialize job: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("The {0} queue has been closed")]
    Closed(QueueName),
    #[error("The {0} queue is full")]
    Full(QueueName),
}

/// The producer side of a job queue.
pub trait QueueBackend: Send + Sync {
    fn name(&self) -> QueueName;

    /// True for the null backend that silently drops jobs.
    fn is_noop(&self) -> bool {
        false
    }

    /// Adds a job to the queue. Returns the id the backend assigned, or `None` if the backend does not assign ids.
    fn add(&self, job: QueuedJob) -> BoxFuture<'_, Result<Option<JobId>, QueueError>>;
}

/// The consumer side of a job queue. Each consumer is owned by exactly one worker.
pub trait JobConsumer: Send {
    fn name(&self) -> QueueName;

    /// Waits for the next job. `None` means the queue has been closed and no more jobs will arrive.
    fn next_job(&mut self) -> BoxFuture<'_, Result<Option<QueuedJob>, QueueError>>;

    /// Marks the job most recently returned by `next_job` as done.
    fn complete(&mut self, job: &QueuedJob) -> BoxFuture<'_, Result<(), QueueError>>;

    /// Lets go of the job most recently returned by `next_job` without finishing it, so that it can be queued again.
    fn release(&mut self, job: &QueuedJob) -> BoxFuture<'_, Result<(), QueueError>>;

    /// Moves the job most recently returned by `next_job` to the failed set.
    fn fail(&mut self, job: &QueuedJob, reason: String) -> BoxFuture<'_, Result<(), QueueError>>;
}

/// Used when no queue backend is configured. Jobs are dropped.
#[derive(Debug, Clone, Copy)]
pub struct NoopQueue {
    name: QueueName,
}

impl NoopQueue {
    pub fn new(name: QueueName) -> Self {
        Self { name }
    }
}

impl QueueBackend for NoopQueue {
    fn name(&self) -> QueueName {
        self.name
    }

    fn is_noop(&self) -> bool {
        true
    }

    fn add(&self, job: QueuedJob) -> BoxFuture<'_, Result<Option<JobId>, QueueError>> {
        Box::pin(async move {
            trace!("📦️ No {} queue is configured. Dropping {} job for order {}", self.name, job.kind, job.payload.order_id);
            Ok(None)
        })
    }
}

/// The consumer halves that go with a [`JobQueues`] instance. Hand these to the workers.
pub struct JobConsumers {
    pub order_events: Box<dyn JobConsumer>,
    pub notifications: Box<dyn JobConsumer>,
}

#[derive(Clone)]
pub struct JobQueues {
    pub order_events: Arc<dyn QueueBackend>,
    pub notifications: Arc<dyn QueueBackend>,
}

impl JobQueues {
    pub fn new(order_events: Arc<dyn QueueBackend>, notifications: Arc<dyn QueueBackend>) -> Self {
        Self { order_events, notifications }
    }

    /// Both queues are null objects.
    pub fn disabled() -> Self {
        Self::new(
            Arc::new(NoopQueue::new(QueueName::OrderEvents)),
            Arc::new(NoopQueue::new(QueueName::Notifications)),
        )
    }

    /// In-process queues backed by tokio channels.
    pub fn memory(buffer_size: usize) -> (Self, JobConsumers) {
        let (order_events, order_events_rx) = MemoryQueue::new(QueueName::OrderEvents, buffer_size);
        let (notifications, notifications_rx) = MemoryQueue::new(QueueName::Notifications, buffer_size);
        let queues = Self::new(Arc::new(order_events), Arc::new(notifications));
        let consumers = JobConsumers { order_events: Box::new(order_events_rx), notifications: Box::new(notifications_rx) };
        (queues, consumers)
    }

    pub async fn redis(url: &str) -> Result<(Self, JobConsumers), QueueError> {
        let order_events = RedisQueue::connect(url, QueueName::OrderEvents).await?;
        let notifications = RedisQueue::connect(url, QueueName::Notifications).await?;
        let order_events_rx = RedisConsumer::connect(url, QueueName::OrderEvents).await?;
        let notifications_rx = RedisConsumer::connect(url, QueueName::Notifications).await?;
        let queues = Self::new(Arc::new(order_events), Arc::new(notifications));
        let consumers = JobConsumers { order_events: Box::new(order_events_rx), notifications: Box::new(notifications_rx) };
        Ok((queues, consumers))
    }

    /// Builds the queues from a backend URL. No URL means queueing is disabled, which is not an error.
    pub async fn from_url(url: Option<&str>, buffer_size: usize) -> Result<(Self, Option<JobConsumers>), QueueError> {
        match url {
            None => {
                info!("📦️ No queue backend is configured. Background jobs are disabled.");
                Ok((Self::disabled(), None))
            },
            Some(u) if u.starts_with("memory://") => {
                info!("📦️ Using in-process job queues");
                let (queues, consumers) = Self::memory(buffer_size);
                Ok((queues, Some(consumers)))
            },
            Some(u) if u.starts_with("redis://") || u.starts_with("rediss://") => {
                info!("📦️ Using Redis job queues");
                let (queues, consumers) = Self::redis(u).await?;
                Ok((queues, Some(consumers)))
            },
            Some(u) => Err(QueueError::UnsupportedUrl(u.to_string())),
        }
    }

    pub fn queue(&self, name: QueueName) -> &Arc<dyn QueueBackend> {
        match name {
            QueueName::OrderEvents => &self.order_events,
            QueueName::Notifications => &self.notifications,
        }
    }

    /// Adds the job to whichever queue carries its kind.
    pub async fn enqueue(&self, job: QueuedJob) -> Result<Option<JobId>, QueueError> {
        self.queue(job.queue()).add(job).await
    }

    /// True if jobs sent to the queue for `name` actually go somewhere.
    pub fn is_enabled(&self, name: QueueName) -> bool {
        !self.queue(name).is_noop()
    }
}

impl Default for JobQueues {
    fn default() -> Self {
        Self::disabled()
    }
}
