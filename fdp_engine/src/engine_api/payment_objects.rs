use fdp_common::Money;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::{OrderId, Payment, PaymentMethod};

/// The body of a payment initiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedPayment {
    pub payment: Payment,
    /// Handed to the client so it can confirm a card payment with the gateway directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    pub order_id: OrderId,
    pub order_number: String,
    pub amount: Money,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

/// A card payment processor.
pub trait PaymentGateway: Send + Sync {
    fn create_payment_intent(&self, request: PaymentIntentRequest) -> BoxFuture<'_, Result<PaymentIntent, GatewayError>>;
}

/// The parts of a Stripe webhook event that matter here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

impl WebhookEvent {
    /// The id of the object the event is about, e.g. the payment intent id.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    PaymentSucceeded { order_id: OrderId, notified: bool },
    PaymentFailed { order_id: OrderId },
    /// A payment event for a transaction we have no record of
    NoMatchingPayment { transaction_id: String },
    Ignored { event_type: String },
}
