//! In-process job queue.
//!
//! Jobs are passed over a bounded tokio channel. There is no persistence: anything still in the channel when the
//! process exits is lost. This is what tests and single-node deployments use.
//!
//! Adding never waits for space. A full channel rejects the job with [`QueueError::Full`].
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use futures_util::future::BoxFuture;
use log::*;
use tokio::sync::{mpsc, mpsc::error::TrySendError};

use super::{
    job_types::{JobId, QueueName, QueuedJob},
    queue::{JobConsumer, QueueBackend, QueueError},
};

#[derive(Clone)]
pub struct MemoryQueue {
    name: QueueName,
    sender: mpsc::Sender<QueuedJob>,
    next_id: Arc<AtomicI64>,
}

impl MemoryQueue {
    pub fn new(name: QueueName, buffer_size: usize) -> (Self, MemoryConsumer) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let queue = Self { name, sender, next_id: Arc::new(AtomicI64::new(1)) };
        let consumer = MemoryConsumer { name, receiver, completed: 0, failed: Vec::new() };
        (queue, consumer)
    }
}

impl QueueBackend for MemoryQueue {
    fn name(&self) -> QueueName {
        self.name
    }

    fn add(&self, mut job: QueuedJob) -> BoxFuture<'_, Result<Option<JobId>, QueueError>> {
        Box::pin(async move {
            let id = match job.id {
                Some(id) => id,
                None => JobId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            };
            job.id = Some(id);
            trace!("📦️ Adding {} {id} to the {} queue", job.kind, self.name);
            match self.sender.try_send(job) {
                Ok(()) => Ok(Some(id)),
                Err(TrySendError::Full(job)) => {
                    warn!("📦️ The {} queue is full. Dropping {} {id}", self.name, job.kind);
                    Err(QueueError::Full(self.name))
                },
                Err(TrySendError::Closed(_)) => Err(QueueError::Closed(self.name)),
            }
        })
    }
}

pub struct MemoryConsumer {
    name: QueueName,
    receiver: mpsc::Receiver<QueuedJob>,
    completed: u64,
    failed: Vec<(QueuedJob, String)>,
}

impl MemoryConsumer {
    /// Removes and returns every job that is currently waiting, without blocking.
    pub fn drain(&mut self) -> Vec<QueuedJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.receiver.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    /// The number of jobs that finished successfully. Jobs released for a retry are not counted.
    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    pub fn failed_jobs(&self) -> &[(QueuedJob, String)] {
        &self.failed
    }
}

impl JobConsumer for MemoryConsumer {
    fn name(&self) -> QueueName {
        self.name
    }

    fn next_job(&mut self) -> BoxFuture<'_, Result<Option<QueuedJob>, QueueError>> {
        Box::pin(async move { Ok(self.receiver.recv().await) })
    }

    fn complete(&mut self, _job: &QueuedJob) -> BoxFuture<'_, Result<(), QueueError>> {
        self.completed += 1;
        Box::pin(async { Ok(()) })
    }

    fn release(&mut self, _job: &QueuedJob) -> BoxFuture<'_, Result<(), QueueError>> {
        // Nothing to clear. The channel handed the job over when it was received.
        Box::pin(async { Ok(()) })
    }

    fn fail(&mut self, job: &QueuedJob, reason: String) -> BoxFuture<'_, Result<(), QueueError>> {
        self.failed.push((job.clone(), reason));
        Box::pin(async { Ok(()) })
    }
}
