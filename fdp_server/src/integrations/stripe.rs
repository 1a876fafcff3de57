//! A minimal Stripe client: just enough of the payment intents API to take card payments.
//!
//! The outcome of a payment is reported back through the webhook, not through this client.
use std::sync::Arc;

use fdp_common::Secret;
use fdp_engine::payment_objects::{GatewayError, PaymentGateway, PaymentIntent, PaymentIntentRequest};
use futures::future::BoxFuture;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};
use serde::Deserialize;
use thiserror::Error;

use crate::config::StripeConfig;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid response from Stripe: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Stripe request failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl From<StripeApiError> for GatewayError {
    fn from(e: StripeApiError) -> Self {
        GatewayError(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    api_url: String,
    client: Arc<Client>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self, StripeApiError> {
        Self::with_key(&config.api_url, &config.secret_key)
    }

    pub fn with_key(api_url: &str, secret_key: &Secret<String>) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { api_url: api_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.api_url)
    }

    /// Creates a payment intent for the order. The order number doubles as the idempotency key, so retrying a request
    /// for the same order never creates a second intent.
    pub async fn create_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, StripeApiError> {
        let url = self.url("/payment_intents");
        debug!("💳 Creating a payment intent for order {} ({} {})", request.order_number, request.amount, request.currency);
        let response = self
            .client
            .post(url)
            .header("Idempotency-Key", request.order_number.as_str())
            .form(&intent_params(request))
            .send()
            .await
            .map_err(|e| StripeApiError::ResponseError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            let intent = response.json::<PaymentIntent>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))?;
            info!("💳 Created payment intent {} for order {}", intent.id, request.order_number);
            Ok(intent)
        } else {
            let body = response.text().await.map_err(|e| StripeApiError::ResponseError(e.to_string()))?;
            let message = error_message(&body);
            warn!("💳 Stripe refused to create a payment intent for order {}. {message}", request.order_number);
            Err(StripeApiError::QueryError { status: status.as_u16(), message })
        }
    }
}

impl PaymentGateway for StripeClient {
    fn create_payment_intent(&self, request: PaymentIntentRequest) -> BoxFuture<'_, Result<PaymentIntent, GatewayError>> {
        Box::pin(async move { self.create_intent(&request).await.map_err(GatewayError::from) })
    }
}

fn intent_params(request: &PaymentIntentRequest) -> Vec<(&'static str, String)> {
    vec![
        ("amount", request.amount.value().to_string()),
        ("currency", request.currency.to_lowercase()),
        ("automatic_payment_methods[enabled]", "true".to_string()),
        ("metadata[orderId]", request.order_id.value().to_string()),
        ("metadata[orderNumber]", request.order_number.clone()),
    ]
}

/// Pulls the human-readable message out of a Stripe error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<StripeErrorBody>(body) {
        Ok(StripeErrorBody { error: StripeErrorDetail { message: Some(m), .. } }) => m,
        Ok(StripeErrorBody { error: StripeErrorDetail { error_type: Some(t), .. } }) => t,
        _ => body.to_string(),
    }
}
