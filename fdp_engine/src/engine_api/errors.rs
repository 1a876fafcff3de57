use thiserror::Error;

use crate::{db_types::OrderId, helpers::SignatureError, lifecycle::TransitionError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Order not found")]
    OrderNotFound(OrderId),
    #[error("{0}")]
    InvalidTransition(#[from] TransitionError),
    #[error("Order {id} has been modified since it was read. The current revision is {current}")]
    RevisionConflict { id: OrderId, current: i64 },
    #[error("Only a superadmin may override the order status sequence")]
    OverrideNotAllowed,
}

impl OrderFlowError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Order not found")]
    OrderNotFound(OrderId),
    #[error("Payment gateway not configured")]
    GatewayNotConfigured,
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Webhook Error: {0}")]
    SignatureError(#[from] SignatureError),
    #[error("Webhook Error: {0}")]
    InvalidWebhookPayload(String),
}
