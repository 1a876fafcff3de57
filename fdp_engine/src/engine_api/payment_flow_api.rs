use std::{fmt::Debug, sync::Arc};

use fdp_common::DEFAULT_CURRENCY_CODE;
use log::*;
use serde_json::json;

use crate::{
    db::traits::OrderStore,
    db_types::{NewPayment, Order, OrderId, Payment, PaymentMethod, PaymentStatus, TransactionStatus},
    engine_api::{
        errors::PaymentFlowError,
        order_objects::AuthenticatedUser,
        payment_objects::{
            InitiatedPayment,
            PaymentGateway,
            PaymentIntentRequest,
            PaymentRequest,
            WebhookEvent,
            WebhookOutcome,
        },
    },
    helpers::WebhookVerifier,
    jobs::{JobQueues, QueuedJob},
    realtime::{EventHub, ServerEvent},
};

pub const PAYMENT_SUCCEEDED_EVENT: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED_EVENT: &str = "payment_intent.payment_failed";

/// `PaymentFlowApi` records payment attempts and applies the gateway's verdict on them.
///
/// Card payments go through a [`PaymentGateway`]. The gateway later reports the result through a signed webhook, which
/// is checked with the configured [`WebhookVerifier`] before anything is written.
pub struct PaymentFlowApi<B> {
    db: B,
    queues: JobQueues,
    hub: Option<EventHub>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    verifier: WebhookVerifier,
    currency: String,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi ({})", if self.gateway.is_some() { "gateway configured" } else { "no gateway" })
    }
}

impl<B: Clone> Clone for PaymentFlowApi<B> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            queues: self.queues.clone(),
            hub: self.hub.clone(),
            gateway: self.gateway.clone(),
            verifier: self.verifier.clone(),
            currency: self.currency.clone(),
        }
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, queues: JobQueues, hub: Option<EventHub>, verifier: WebhookVerifier) -> Self {
        Self { db, queues, hub, gateway: None, verifier, currency: DEFAULT_CURRENCY_CODE.to_string() }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }
}

impl<B> PaymentFlowApi<B>
where B: OrderStore
{
    /// Records a payment attempt for the order's total.
    ///
    /// Cash and wallet payments are stored as pending straight away. Card payments create a payment intent with the
    /// gateway first, and the intent id becomes the payment's transaction id so the webhook can find it later.
    pub async fn initiate_payment(
        &self,
        request: PaymentRequest,
        user: &AuthenticatedUser,
    ) -> Result<InitiatedPayment, PaymentFlowError> {
        let order = self
            .db
            .fetch_order(request.order_id)
            .await
            .map_err(|e| PaymentFlowError::DatabaseError(e.to_string()))?
            .ok_or(PaymentFlowError::OrderNotFound(request.order_id))?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(PaymentFlowError::ValidationError(format!("Order {} has already been paid", order.id)));
        }
        let amount = order.pricing.total;
        let (new_payment, client_secret) = match request.method {
            PaymentMethod::Card => {
                let gateway = self.gateway.as_ref().ok_or(PaymentFlowError::GatewayNotConfigured)?;
                let intent_request = PaymentIntentRequest {
                    order_id: order.id,
                    order_number: order.order_number.clone(),
                    amount,
                    currency: self.currency.clone(),
                };
                let intent = gateway
                    .create_payment_intent(intent_request)
                    .await
                    .map_err(|e| PaymentFlowError::GatewayError(e.to_string()))?;
                debug!("💳 Payment intent {} created for order {}", intent.id, order.id);
                let payment = NewPayment::new(order.id, amount, PaymentMethod::Card)
                    .with_transaction_id(intent.id.clone())
                    .with_metadata(json!({ "paymentIntentId": intent.id, "intentStatus": intent.status }));
                (payment, intent.client_secret)
            },
            method => (NewPayment::new(order.id, amount, method), None),
        };
        let payment =
            self.db.insert_payment(new_payment).await.map_err(|e| PaymentFlowError::DatabaseError(e.to_string()))?;
        info!(
            "💳 {} initiated a {} payment of {} for order {}",
            user.user_id, payment.method, payment.amount, payment.order_id
        );
        Ok(InitiatedPayment { payment, client_secret })
    }

    pub async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, PaymentFlowError> {
        let exists =
            self.db.fetch_order(order_id).await.map_err(|e| PaymentFlowError::DatabaseError(e.to_string()))?.is_some();
        if !exists {
            return Err(PaymentFlowError::OrderNotFound(order_id));
        }
        self.db.fetch_payments_for_order(order_id).await.map_err(|e| PaymentFlowError::DatabaseError(e.to_string()))
    }

    /// Verifies and applies a gateway webhook delivery.
    ///
    /// Nothing is written unless the signature checks out. Verified deliveries always succeed, whether or not they
    /// changed anything; the outcome says what happened.
    pub async fn handle_webhook(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, PaymentFlowError> {
        self.verifier.verify(signature, body)?;
        let event = serde_json::from_slice::<WebhookEvent>(body)
            .map_err(|e| PaymentFlowError::InvalidWebhookPayload(e.to_string()))?;
        trace!("💳 Verified webhook event {} ({})", event.id, event.event_type);
        let status = match event.event_type.as_str() {
            PAYMENT_SUCCEEDED_EVENT => TransactionStatus::Succeeded,
            PAYMENT_FAILED_EVENT => TransactionStatus::Failed,
            other => {
                debug!("💳 Ignoring webhook event of type {other}");
                return Ok(WebhookOutcome::Ignored { event_type: other.to_string() });
            },
        };
        let transaction_id = event
            .object_id()
            .ok_or_else(|| PaymentFlowError::InvalidWebhookPayload("event object has no id".into()))?
            .to_string();
        let payment = self
            .db
            .update_payment_status(&transaction_id, status)
            .await
            .map_err(|e| PaymentFlowError::DatabaseError(e.to_string()))?;
        let Some(payment) = payment else {
            warn!("💳 Webhook {} refers to unknown transaction {transaction_id}", event.event_type);
            return Ok(WebhookOutcome::NoMatchingPayment { transaction_id });
        };
        if status == TransactionStatus::Failed {
            info!("💳 Payment {transaction_id} for order {} failed", payment.order_id);
            return Ok(WebhookOutcome::PaymentFailed { order_id: payment.order_id });
        }
        let order = self
            .db
            .update_order_payment_status(payment.order_id, PaymentStatus::Paid)
            .await
            .map_err(|e| PaymentFlowError::DatabaseError(e.to_string()))?;
        let notified = match order {
            Some(order) => {
                info!("💳 Order {} has been paid ({transaction_id})", order.id);
                self.queue_confirmation(&order).await;
                self.announce(&order)
            },
            None => {
                warn!("💳 Payment {transaction_id} succeeded, but order {} no longer exists", payment.order_id);
                false
            },
        };
        Ok(WebhookOutcome::PaymentSucceeded { order_id: payment.order_id, notified })
    }

    async fn queue_confirmation(&self, order: &Order) {
        if let Err(e) = self.queues.enqueue(QueuedJob::payment_confirmed(order.id)).await {
            warn!("💳📦️ Could not queue payment confirmation for order {}: {e}", order.id);
        }
    }

    fn announce(&self, order: &Order) -> bool {
        let Some(hub) = self.hub.as_ref() else {
            return false;
        };
        match hub.publish_to_order(order.id, ServerEvent::payment_update(order)) {
            Ok(_) => true,
            Err(e) => {
                warn!("💳📡️ Could not publish the payment update for order {}: {e}", order.id);
                false
            },
        }
    }
}
