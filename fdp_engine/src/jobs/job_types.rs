use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueName {
    #[serde(rename = "order-events")]
    OrderEvents,
    #[serde(rename = "notifications")]
    Notifications,
}

impl QueueName {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::OrderEvents => "order-events",
            QueueName::Notifications => "notifications",
        }
    }
}

impl Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    OrderPlaced,
    StatusChanged,
    PaymentConfirmed,
}

impl JobKind {
    /// The queue that carries jobs of this kind.
    pub fn queue(&self) -> QueueName {
        match self {
            JobKind::OrderPlaced | JobKind::StatusChanged => QueueName::OrderEvents,
            JobKind::PaymentConfirmed => QueueName::Notifications,
        }
    }
}

impl Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::OrderPlaced => f.write_str("ORDER_PLACED"),
            JobKind::StatusChanged => f.write_str("STATUS_CHANGED"),
            JobKind::PaymentConfirmed => f.write_str("PAYMENT_CONFIRMED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub order_id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<OrderStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedJob {
    /// Assigned by the backend when the job is added
    #[serde(default)]
    pub id: Option<JobId>,
    pub kind: JobKind,
    pub payload: JobPayload,
    /// How many times this job has already been tried
    #[serde(default)]
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedJob {
    pub fn new(kind: JobKind, payload: JobPayload) -> Self {
        Self { id: None, kind, payload, attempts: 0, enqueued_at: Utc::now() }
    }

    pub fn order_placed(order_id: OrderId) -> Self {
        Self::new(JobKind::OrderPlaced, JobPayload { order_id, status: None, previous_status: None })
    }

    pub fn status_changed(order_id: OrderId, previous_status: OrderStatus, status: OrderStatus) -> Self {
        Self::new(JobKind::StatusChanged, JobPayload {
            order_id,
            status: Some(status),
            previous_status: Some(previous_status),
        })
    }

    pub fn payment_confirmed(order_id: OrderId) -> Self {
        Self::new(JobKind::PaymentConfirmed, JobPayload { order_id, status: None, previous_status: None })
    }

    pub fn queue(&self) -> QueueName {
        self.kind.queue()
    }
}
