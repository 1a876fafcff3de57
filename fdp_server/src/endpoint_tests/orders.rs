use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use fdp_engine::{
    db_types::{OrderId, OrderStatus, Role},
    realtime::EventHub,
    test_utils::prepare_env::{insert_sample_order, prepare_test_db},
    OrderManagement,
    SqliteDatabase,
};
use serde_json::json;

use super::{
    helpers::{json, jwt_middleware, register_apis, send_request, token_for},
    mocks::{failing_store, racing_store, MockOrderStore},
};
use crate::routes::{
    DeleteOrderRoute,
    OrderByIdRoute,
    OrdersRoute,
    PlaceGuestOrderRoute,
    PlaceOrderRoute,
    UpdateOrderRoute,
};

fn burger_order() -> serde_json::Value {
    json!({
        "restaurants": ["rest-1"],
        "items": [{ "product": "burger", "quantity": 2, "price": 750 }],
        "pricing": { "subtotal": 1500, "total": 1 },
        "paymentMethod": "cash",
        "deliveryAddress": { "address": "12 Long Street", "city": "Cape Town" }
    })
}

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        register_apis(cfg, db, EventHub::new());
        cfg.service(PlaceGuestOrderRoute::<SqliteDatabase>::new()).service(
            web::scope("/api")
                .wrap(jwt_middleware())
                .service(PlaceOrderRoute::<SqliteDatabase>::new())
                .service(OrdersRoute::<SqliteDatabase>::new())
                .service(OrderByIdRoute::<SqliteDatabase>::new())
                .service(UpdateOrderRoute::<SqliteDatabase>::new())
                .service(DeleteOrderRoute::<SqliteDatabase>::new()),
        );
    }
}

#[actix_web::test]
async fn guest_order_is_placed() {
    let db = prepare_test_db().await;
    let req = TestRequest::post().uri("/orders/guest").set_json(burger_order());
    let (status, body) = send_request(req, None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert!(body["orderNumber"].as_str().unwrap().starts_with("ORD-"));
    let order = &body["data"];
    assert_eq!(order["customerId"], "guest");
    assert_eq!(order["restaurantId"], "rest-1");
    assert_eq!(order["status"], "placed");
    assert_eq!(order["paymentStatus"], "pending");
    // The client's total is ignored and the default delivery fee applied
    assert_eq!(order["pricing"], json!({ "subtotal": 1500, "deliveryFee": 4000, "total": 5500 }));
    assert_eq!(order["deliveryLocation"]["address"], "12 Long Street");
    assert_eq!(body["sideEffects"]["persisted"], true);
    assert_eq!(body["sideEffects"]["queued"], false);

    let id = OrderId(body["orderId"].as_i64().unwrap());
    let stored = db.fetch_order(id).await.unwrap().expect("Order was not stored");
    assert_eq!(stored.customer_id, "guest");
}

#[actix_web::test]
async fn incomplete_orders_are_rejected() {
    let db = prepare_test_db().await;
    let mut order = burger_order();
    order.as_object_mut().unwrap().remove("pricing");
    let req = TestRequest::post().uri("/orders/guest").set_json(order);
    let (status, body) = send_request(req, None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"success":false,"message":"pricing is required"}"#);

    let mut order = burger_order();
    order["restaurants"] = json!([]);
    let req = TestRequest::post().uri("/orders/guest").set_json(order);
    let (status, body) = send_request(req, None, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("restaurants must contain at least one restaurant"), "was: {body}");
}

#[actix_web::test]
async fn oversized_totals_are_rejected() {
    let db = prepare_test_db().await;
    let mut order = burger_order();
    order["pricing"] = json!({ "subtotal": i64::MAX, "deliveryFee": 1 });
    let req = TestRequest::post().uri("/orders/guest").set_json(order);
    let (status, body) = send_request(req, None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"success":false,"message":"pricing total is out of range"}"#);
    let orders = db.search_orders(Default::default()).await.unwrap();
    assert!(orders.is_empty());
}

#[actix_web::test]
async fn malformed_bodies_get_a_json_error() {
    let db = prepare_test_db().await;
    let mut order = burger_order();
    order["restaurants"] = json!("x");
    let req = TestRequest::post().uri("/orders/guest").set_json(order);
    let (status, body) = send_request(req, None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"success":false,"message":"Could not read request body"#), "was: {body}");

    let mut order = burger_order();
    order["pricing"] = json!({ "subtotal": 12.5 });
    let req = TestRequest::post().uri("/orders/guest").set_json(order);
    let (status, body) = send_request(req, None, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"success":false,"message":"Could not read request body"#), "was: {body}");
}

#[actix_web::test]
async fn malformed_order_ids_get_a_json_error() {
    let db = prepare_test_db().await;
    let req = TestRequest::get().uri("/api/orders/not-a-number");
    let token = token_for("admin-1", Role::Admin);
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"success":false,"message":"Could not read request path"#), "was: {body}");

    let db = prepare_test_db().await;
    let req = TestRequest::get().uri("/api/orders?status=lost");
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"success":false,"message":"Could not read query string"#), "was: {body}");
}

#[actix_web::test]
async fn placing_an_order_needs_a_token() {
    let db = prepare_test_db().await;
    let req = TestRequest::post().uri("/api/orders").set_json(burger_order());
    let (status, body) = send_request(req, None, configure(db.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token was provided"), "was: {body}");

    let req = TestRequest::post().uri("/api/orders").set_json(burger_order());
    let (status, body) = send_request(req, Some("not.a.token"), configure(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is not in the correct format"), "was: {body}");
}

#[actix_web::test]
async fn customer_places_multi_restaurant_order() {
    let db = prepare_test_db().await;
    let token = token_for("alice", Role::Customer);
    let mut order = burger_order();
    order["restaurants"] = json!([{ "restaurantId": "rest-1", "name": "Burger Barn" }, "rest-2"]);
    let req = TestRequest::post().uri("/api/orders").set_json(order);
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::CREATED, "was: {body}");
    let order = &json(&body)["data"];
    assert_eq!(order["customerId"], "alice");
    assert_eq!(order["restaurantId"], "rest-1");
    let restaurants = order["multiRestaurantData"].as_array().expect("Expected restaurant data");
    assert_eq!(restaurants.len(), 2);
    assert_eq!(restaurants[1]["restaurantId"], "rest-2");
}

#[actix_web::test]
async fn orders_are_filtered_by_participant() {
    let db = prepare_test_db().await;
    insert_sample_order(&db, "alice", "rest-1").await;
    insert_sample_order(&db, "bob", "rest-1").await;
    insert_sample_order(&db, "bob", "rest-2").await;

    let token = token_for("alice", Role::Customer);
    let (status, body) = send_request(TestRequest::get().uri("/api/orders"), Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json(&body)["data"].as_array().cloned().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["customerId"], "alice");

    let token = token_for("rest-1", Role::Restaurant);
    let (_, body) = send_request(TestRequest::get().uri("/api/orders"), Some(&token), configure(db.clone())).await;
    assert_eq!(json(&body)["data"].as_array().unwrap().len(), 2);

    let token = token_for("root", Role::Admin);
    let (_, body) = send_request(TestRequest::get().uri("/api/orders"), Some(&token), configure(db.clone())).await;
    assert_eq!(json(&body)["data"].as_array().unwrap().len(), 3);

    let req = TestRequest::get().uri("/api/orders?status=confirmed");
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"data":[]}"#);
}

#[actix_web::test]
async fn fetch_single_order() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    let token = token_for("alice", Role::Customer);
    let req = TestRequest::get().uri(&format!("/api/orders/{}", order.id.value()));
    let (status, body) = send_request(req, Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let data = &json(&body)["data"];
    assert_eq!(data["orderNumber"], order.order_number.as_str());
    assert_eq!(data["customer"], serde_json::Value::Null);

    let (status, body) = send_request(TestRequest::get().uri("/api/orders/9999"), Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"success":false,"message":"Order not found"}"#);
}

#[actix_web::test]
async fn status_moves_along_the_sequence() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    let uri = format!("/api/orders/{}", order.id.value());
    let token = token_for("rest-1", Role::Restaurant);

    let req = TestRequest::put().uri(&uri).set_json(json!({ "status": "confirmed", "notes": "No onions" }));
    let (status, body) = send_request(req, Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let body = json(&body);
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(body["data"]["notes"], "No onions");
    assert_eq!(body["data"]["revision"], order.revision + 1);

    let req = TestRequest::put().uri(&uri).set_json(json!({ "status": "delivered" }));
    let (status, body) = send_request(req, Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Cannot move an order from confirmed to delivered"), "was: {body}");

    let stored = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Confirmed);
}

#[actix_web::test]
async fn stale_revisions_are_rejected() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    let token = token_for("rest-1", Role::Restaurant);
    let req = TestRequest::put()
        .uri(&format!("/api/orders/{}", order.id.value()))
        .set_json(json!({ "status": "confirmed", "revision": order.revision + 5 }));
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("has been modified since it was read"), "was: {body}");
}

#[actix_web::test]
async fn losing_a_write_race_is_a_conflict() {
    let order = insert_sample_order(&prepare_test_db().await, "alice", "rest-1").await;
    let uri = format!("/api/orders/{}", order.id.value());
    let token = token_for("rest-1", Role::Restaurant);
    let configure = move |cfg: &mut ServiceConfig| {
        register_apis(cfg, racing_store(order), EventHub::new());
        cfg.service(web::scope("/api").wrap(jwt_middleware()).service(UpdateOrderRoute::<MockOrderStore>::new()));
    };
    let req = TestRequest::put().uri(&uri).set_json(json!({ "status": "confirmed" }));
    let (status, body) = send_request(req, Some(&token), configure).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("has been modified since it was read"), "was: {body}");
}

#[actix_web::test]
async fn only_superadmins_override_the_sequence() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    let uri = format!("/api/orders/{}", order.id.value());
    let update = json!({ "status": "delivered", "overrideTransition": true });

    let token = token_for("root", Role::Admin);
    let req = TestRequest::put().uri(&uri).set_json(update.clone());
    let (status, _) = send_request(req, Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = token_for("root", Role::SuperAdmin);
    let req = TestRequest::put().uri(&uri).set_json(update);
    let (status, body) = send_request(req, Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    assert_eq!(json(&body)["data"]["status"], "delivered");
}

#[actix_web::test]
async fn deleting_orders_needs_admin() {
    let db = prepare_test_db().await;
    let order = insert_sample_order(&db, "alice", "rest-1").await;
    let uri = format!("/api/orders/{}", order.id.value());

    let token = token_for("alice", Role::Customer);
    let (status, body) = send_request(TestRequest::delete().uri(&uri), Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("This action requires the admin role"), "was: {body}");

    let token = token_for("root", Role::SuperAdmin);
    let (status, body) = send_request(TestRequest::delete().uri(&uri), Some(&token), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Order deleted successfully"}"#);
    assert!(db.fetch_order(order.id).await.unwrap().is_none());

    let (status, _) = send_request(TestRequest::delete().uri(&uri), Some(&token), configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn database_failures_are_server_errors() {
    let token = token_for("alice", Role::Customer);
    let configure = |cfg: &mut ServiceConfig| {
        register_apis(cfg, failing_store(), EventHub::new());
        cfg.service(
            web::scope("/api")
                .wrap(jwt_middleware())
                .service(OrdersRoute::<MockOrderStore>::new())
                .service(OrderByIdRoute::<MockOrderStore>::new()),
        );
    };
    let (status, body) = send_request(TestRequest::get().uri("/api/orders/1"), Some(&token), configure).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("connection refused"), "was: {body}");
}
