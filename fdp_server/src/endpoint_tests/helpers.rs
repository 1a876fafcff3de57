use actix_web::{
    body::MessageBody,
    http::{header::AUTHORIZATION, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use fdp_common::Secret;
use fdp_engine::{
    db_types::Role,
    helpers::{WebhookVerifier, DEFAULT_TOLERANCE_SECS},
    jobs::JobQueues,
    realtime::EventHub,
    OrderFlowApi,
    OrderStore,
    PaymentFlowApi,
};
use log::debug;
use serde_json::Value;

use crate::{
    auth::{JwtClaims, TokenIssuer, TokenValidator},
    config::AuthConfig,
    middleware::JwtMiddlewareFactory,
    server::configure_extractors,
};

pub const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("6b1e0d3c5f8a47e2b9d4c0a1f7e3d2c8b5a9f0e1d4c7b2a3")
}

pub fn issue_token(claims: JwtClaims) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(claims, None).expect("Failed to sign token")
}

pub fn token_for(user_id: &str, role: Role) -> String {
    issue_token(JwtClaims::new(user_id, role))
}

pub fn jwt_middleware() -> JwtMiddlewareFactory {
    JwtMiddlewareFactory::new(TokenValidator::new(&get_auth_config()))
}

pub fn webhook_verifier() -> WebhookVerifier {
    WebhookVerifier::new(Secret::new(WEBHOOK_SECRET.to_string()), DEFAULT_TOLERANCE_SECS)
}

/// Registers the order and payment APIs, the hub, the token validator and the extractor error handlers, backed by `db`.
pub fn register_apis<B: OrderStore + 'static>(cfg: &mut ServiceConfig, db: B, hub: EventHub) {
    let orders_api = OrderFlowApi::new(db.clone(), JobQueues::disabled(), Some(hub.clone()));
    let payments_api = PaymentFlowApi::new(db, JobQueues::disabled(), Some(hub.clone()), webhook_verifier());
    cfg.app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(payments_api))
        .app_data(web::Data::new(hub))
        .app_data(web::Data::new(TokenValidator::new(&get_auth_config())))
        .configure(configure_extractors);
}

/// Sends the request to a fresh app built by `configure`. Errors raised by middleware are rendered into responses, so
/// callers always get a status and a body back.
pub async fn send_request<F>(req: TestRequest, token: Option<&str>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let _ = env_logger::try_init();
    let req = match token {
        Some(token) => req.insert_header((AUTHORIZATION, format!("Bearer {token}"))),
        None => req,
    };
    let app = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    match test::try_call_service(&app, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response was not JSON ({e}): {body}"))
}
