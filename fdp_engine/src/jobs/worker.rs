use std::{future::Future, sync::Arc};

use futures_util::future::BoxFuture;
use log::*;
use serde_json::Value;
use thiserror::Error;

use super::{
    job_types::{JobKind, QueuedJob},
    queue::{JobConsumer, QueueBackend},
};

/// The number of times a job is tried before it is moved to the failed set. A single attempt means no retries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

#[derive(Debug, Clone, Error)]
#[error("Job failed: {0}")]
pub struct JobError(pub String);

pub type JobHandler = Arc<dyn Fn(QueuedJob) -> BoxFuture<'static, Result<Value, JobError>> + Send + Sync>;

/// The built-in job processor. It records the job and hands back its payload as the result.
pub async fn process_job(job: QueuedJob) -> Result<Value, JobError> {
    let order_id = job.payload.order_id;
    match job.kind {
        JobKind::OrderPlaced => {
            info!("📦️ Processing new order {order_id}");
        },
        JobKind::StatusChanged => {
            let from = job.payload.previous_status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".into());
            let to = job.payload.status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".into());
            info!("📦️ Order {order_id} moved from {from} to {to}");
        },
        JobKind::PaymentConfirmed => {
            info!("📦️ Payment confirmed for order {order_id}");
        },
    }
    serde_json::to_value(&job.payload).map_err(|e| JobError(e.to_string()))
}

/// Wraps an async function as a [`JobHandler`].
pub fn job_handler<F, Fut>(f: F) -> JobHandler
where
    F: Fn(QueuedJob) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, JobError>> + Send + 'static,
{
    Arc::new(move |job| -> BoxFuture<'static, Result<Value, JobError>> { Box::pin(f(job)) })
}

pub fn default_job_handler() -> JobHandler {
    job_handler(process_job)
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(Value),
    /// The job failed and was put back on the queue. Carries the attempt count so far.
    Retried(u32),
    Failed(String),
}

/// Pulls jobs off one queue and runs them through the handler, one at a time.
pub struct JobWorker {
    queue: Arc<dyn QueueBackend>,
    consumer: Box<dyn JobConsumer>,
    handler: JobHandler,
    max_attempts: u32,
}

impl JobWorker {
    pub fn new(queue: Arc<dyn QueueBackend>, consumer: Box<dyn JobConsumer>, max_attempts: u32) -> Self {
        Self { queue, consumer, handler: default_job_handler(), max_attempts: max_attempts.max(1) }
    }

    pub fn with_handler(mut self, handler: JobHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Runs until the queue is closed.
    pub async fn run(mut self) {
        let name = self.consumer.name();
        info!("📦️ Starting worker for the {name} queue");
        loop {
            match self.consumer.next_job().await {
                Ok(Some(job)) => {
                    let _ = self.run_job(job).await;
                },
                Ok(None) => break,
                Err(e) => {
                    error!("📦️ Could not fetch the next job from the {name} queue: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                },
            }
        }
        info!("📦️ Worker for the {name} queue has shut down");
    }

    /// Processes one job and settles it with the consumer.
    pub async fn run_job(&mut self, mut job: QueuedJob) -> JobOutcome {
        let label = job.id.map(|id| id.to_string()).unwrap_or_else(|| "job".into());
        debug!("📦️ Running {} {label} (attempt {})", job.kind, job.attempts + 1);
        match (self.handler)(job.clone()).await {
            Ok(value) => {
                if let Err(e) = self.consumer.complete(&job).await {
                    warn!("📦️ {label} finished but could not be marked complete: {e}");
                }
                debug!("📦️ {} {label} completed", job.kind);
                JobOutcome::Completed(value)
            },
            Err(JobError(reason)) => {
                job.attempts += 1;
                if job.attempts < self.max_attempts {
                    warn!("📦️ {label} failed ({reason}). Retrying, {} of {} attempts used", job.attempts, self.max_attempts);
                    if let Err(e) = self.consumer.release(&job).await {
                        warn!("📦️ Could not clear {label} before retrying it: {e}");
                    }
                    let attempts = job.attempts;
                    match self.queue.add(job).await {
                        Ok(_) => JobOutcome::Retried(attempts),
                        Err(e) => {
                            error!("📦️ Could not requeue {label}: {e}");
                            JobOutcome::Failed(reason)
                        },
                    }
                } else {
                    error!("📦️ {label} failed after {} attempt(s): {reason}", job.attempts);
                    if let Err(e) = self.consumer.fail(&job, reason.clone()).await {
                        error!("📦️ Could not move {label} to the failed set: {e}");
                    }
                    JobOutcome::Failed(reason)
                }
            },
        }
    }
}
