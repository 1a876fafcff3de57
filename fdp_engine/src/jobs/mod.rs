//! Background job queues.
//!
//! Order lifecycle changes are handed off to queues so that slow follow-up work (notifications, ETA computation) never
//! holds up the request that caused it. The producer side ([`QueueBackend`]) and the consumer side ([`JobConsumer`])
//! are separate so that the HTTP handlers only ever hold producers, and each worker owns exactly one consumer.
mod job_types;
mod memory;
mod queue;
mod redis_queue;
mod worker;

pub use job_types::{JobId, JobKind, JobPayload, QueueName, QueuedJob};
pub use memory::{MemoryConsumer, MemoryQueue};
pub use queue::{JobConsumer, JobConsumers, JobQueues, NoopQueue, QueueBackend, QueueError};
pub use redis_queue::{RedisConsumer, RedisQueue};
pub use worker::{
    default_job_handler,
    job_handler,
    process_job,
    JobError,
    JobHandler,
    JobOutcome,
    JobWorker,
    DEFAULT_MAX_ATTEMPTS,
};
