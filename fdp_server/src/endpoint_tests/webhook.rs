use actix_web::{http::StatusCode, test::TestRequest, web::ServiceConfig};
use chrono::Utc;
use fdp_engine::{
    db_types::{NewPayment, PaymentMethod, PaymentStatus, TransactionStatus},
    realtime::EventHub,
    test_utils::prepare_env::{insert_sample_order, prepare_test_db},
    OrderManagement,
    PaymentManagement,
    SqliteDatabase,
};

use super::helpers::{register_apis, send_request, webhook_verifier};
use crate::routes::{StripeWebhookRoute, STRIPE_SIGNATURE_HEADER};

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        register_apis(cfg, db, EventHub::new());
        cfg.service(StripeWebhookRoute::<SqliteDatabase>::new());
    }
}

fn webhook_request(body: &str, signature: Option<String>) -> TestRequest {
    let req = TestRequest::post().uri("/payments/webhook/stripe").set_payload(body.to_string());
    match signature {
        Some(sig) => req.insert_header((STRIPE_SIGNATURE_HEADER, sig)),
        None => req,
    }
}

fn sign(body: &str) -> String {
    webhook_verifier().sign(body.as_bytes(), Utc::now().timestamp()).expect("Could not sign payload")
}

fn intent_event(event_type: &str, intent_id: &str) -> String {
    format!(r#"{{"id":"evt_1","type":"{event_type}","data":{{"object":{{"id":"{intent_id}","object":"payment_intent"}}}}}}"#)
}

async fn card_payment(db: &SqliteDatabase, intent_id: &str) -> i64 {
    let order = insert_sample_order(db, "alice", "rest-1").await;
    let payment = NewPayment::new(order.id, order.pricing.total, PaymentMethod::Card).with_transaction_id(intent_id);
    db.insert_payment(payment).await.expect("Error inserting payment");
    order.id.value()
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let db = prepare_test_db().await;
    let body = intent_event("payment_intent.succeeded", "pi_1");
    let (status, body) = send_request(webhook_request(&body, None), None, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Webhook Error"), "was: {body}");
}

#[actix_web::test]
async fn tampered_webhooks_are_rejected() {
    let db = prepare_test_db().await;
    let order_id = card_payment(&db, "pi_1").await;
    let signature = sign(&intent_event("payment_intent.succeeded", "pi_other"));
    let body = intent_event("payment_intent.succeeded", "pi_1");
    let (status, body) = send_request(webhook_request(&body, Some(signature)), None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Webhook Error"), "was: {body}");

    let order = db.fetch_order(order_id.into()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn successful_payment_marks_order_paid() {
    let db = prepare_test_db().await;
    let order_id = card_payment(&db, "pi_paid").await;
    let body = intent_event("payment_intent.succeeded", "pi_paid");
    let signature = sign(&body);
    let (status, body) = send_request(webhook_request(&body, Some(signature)), None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);

    let payment = db.fetch_payment_by_transaction_id("pi_paid").await.unwrap().unwrap();
    assert_eq!(payment.status, TransactionStatus::Succeeded);
    let order = db.fetch_order(order_id.into()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn failed_payment_leaves_order_pending() {
    let db = prepare_test_db().await;
    let order_id = card_payment(&db, "pi_declined").await;
    let body = intent_event("payment_intent.payment_failed", "pi_declined");
    let signature = sign(&body);
    let (status, _) = send_request(webhook_request(&body, Some(signature)), None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let payment = db.fetch_payment_by_transaction_id("pi_declined").await.unwrap().unwrap();
    assert_eq!(payment.status, TransactionStatus::Failed);
    let order = db.fetch_order(order_id.into()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn other_events_are_acknowledged() {
    let db = prepare_test_db().await;
    let body = r#"{"id":"evt_2","type":"charge.refunded","data":{"object":{"id":"ch_1"}}}"#;
    let (status, body) = send_request(webhook_request(body, Some(sign(body))), None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);

    // Unknown transactions are acknowledged too, so that Stripe stops retrying
    let body = intent_event("payment_intent.succeeded", "pi_nobody");
    let (status, _) = send_request(webhook_request(&body, Some(sign(&body))), None, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn malformed_events_are_rejected() {
    let db = prepare_test_db().await;
    let body = r#"{"not":"an event"}"#;
    let (status, body) = send_request(webhook_request(body, Some(sign(body))), None, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Webhook Error"), "was: {body}");
}
