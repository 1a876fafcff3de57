use fdp_engine::jobs::{JobConsumers, JobQueues, JobWorker};
use log::*;
use tokio::task::JoinHandle;

/// Starts one worker per queue. Do not await the returned JoinHandles, as they run until their queue is closed.
pub fn start_queue_workers(queues: &JobQueues, consumers: JobConsumers, max_attempts: u32) -> Vec<JoinHandle<()>> {
    let JobConsumers { order_events, notifications } = consumers;
    info!("📦️ Starting queue workers (max {max_attempts} attempt(s) per job)");
    vec![
        tokio::spawn(JobWorker::new(queues.order_events.clone(), order_events, max_attempts).run()),
        tokio::spawn(JobWorker::new(queues.notifications.clone(), notifications, max_attempts).run()),
    ]
}
