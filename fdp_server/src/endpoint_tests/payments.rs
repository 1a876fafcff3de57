use std::sync::Arc;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use fdp_engine::{
    db_types::{PaymentStatus, Role},
    jobs::JobQueues,
    payment_objects::{GatewayError, PaymentGateway, PaymentIntent, PaymentIntentRequest},
    realtime::EventHub,
    test_utils::prepare_env::{insert_sample_order, prepare_test_db},
    PaymentFlowApi,
    PaymentManagement,
    SqliteDatabase,
};
use futures::future::BoxFuture;
use serde_json::json;

use super::helpers::{json, jwt_middleware, register_apis, send_request, token_for, webhook_verifier};
use crate::routes::{InitiatePaymentRoute, OrderPaymentsRoute};

struct FakeGateway;

impl PaymentGateway for FakeGateway {
    fn create_payment_intent(&self, request: PaymentIntentRequest) -> BoxFuture<'_, Result<PaymentIntent, GatewayError>> {
        Box::pin(async move {
            Ok(PaymentIntent {
                id: format!("pi_test_{}", request.order_id.value()),
                client_secret: Some(format!("pi_test_{}_secret_abc", request.order_id.value())),
                status: "requires_payment_method".to_string(),
            })
        })
    }
}

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        register_apis(cfg, db, EventHub::new());
        cfg.service(
            web::scope("/api")
                .wrap(jwt_middleware())
                .service(InitiatePaymentRoute::<SqliteDatabase>::new())
                .service(OrderPaymentsRoute::<SqliteDatabase>::new()),
        );
    }
}

fn configure_with_gateway(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        register_apis(cfg, db.clone(), EventHub::new());
        // Replaces the gateway-less payments API registered above
        let payments_api = PaymentFlowApi::new(db, JobQueues::disabled(), None, webhook_verifier())
            .with_gateway(Arc::new(FakeGateway))
            .with_currency("zar");
        cfg.app_data(web::Data::new(payments_api)).service(
            web::scope("/api")
                .wrap(jwt_middleware())
                .service(InitiatePaymentRoute::<SqliteDatabase>::new())
                .service(OrderPaymentsRoute::<SqliteDatabase>::new()),
        );
    }
}

#[actix_web::test]
async fn cash_payment_is_recorded_as_pending() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    let token = token_for("alice", Role::Customer);
    let req = TestRequest::post().uri("/api/payments").set_json(json!({ "orderId": order.id, "method": "cash" }));
    let (status, body) = send_request(req, Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let body = json(&body);
    let payment = &body["data"]["payment"];
    assert_eq!(payment["amount"], order.pricing.total.value());
    assert_eq!(payment["method"], "cash");
    assert_eq!(payment["status"], "pending");
    assert!(body["data"].get("clientSecret").is_none());

    let req = TestRequest::get().uri(&format!("/api/orders/{}/payments", order.id.value()));
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["data"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn card_payment_without_gateway() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    let token = token_for("alice", Role::Customer);
    let req = TestRequest::post().uri("/api/payments").set_json(json!({ "orderId": order.id, "method": "card" }));
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, r#"{"success":false,"message":"Payment gateway not configured"}"#);
}

#[actix_web::test]
async fn card_payment_creates_an_intent() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    let token = token_for("alice", Role::Customer);
    let req = TestRequest::post().uri("/api/payments").set_json(json!({ "orderId": order.id, "method": "card" }));
    let (status, body) = send_request(req, Some(&token), configure_with_gateway(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let body = json(&body);
    let intent_id = format!("pi_test_{}", order.id.value());
    assert_eq!(body["data"]["clientSecret"], format!("{intent_id}_secret_abc"));
    assert_eq!(body["data"]["payment"]["transactionId"], intent_id.as_str());

    let payment = db.fetch_payment_by_transaction_id(&intent_id).await.unwrap().expect("Payment was not stored");
    assert_eq!(payment.order_id, order.id);
    assert_eq!(payment.amount, order.pricing.total);
}

#[actix_web::test]
async fn paid_orders_cannot_be_paid_again() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    db.update_order_payment_status(order.id, PaymentStatus::Paid).await.unwrap();
    let token = token_for("alice", Role::Customer);
    let req = TestRequest::post().uri("/api/payments").set_json(json!({ "orderId": order.id, "method": "wallet" }));
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("has already been paid"), "was: {body}");
}

#[actix_web::test]
async fn payments_for_unknown_orders() {
    let db = prepare_test_db().await;
    let token = token_for("alice", Role::Customer);
    let req = TestRequest::post().uri("/api/payments").set_json(json!({ "orderId": 404, "method": "cash" }));
    let (status, _) = send_request(req, Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_request(TestRequest::get().uri("/api/orders/404/payments"), Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::post().uri("/api/payments").set_json(json!({ "orderId": 1, "method": "cash" }));
    let (status, _) = send_request(req, None, configure(prepare_test_db().await)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
