use actix_web::{
    http::{header, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use fdp_engine::{db_types::Role, realtime::EventHub};

use super::helpers::{get_auth_config, send_request, token_for};
use crate::{auth::TokenValidator, socket::socket};

fn configure(hub: EventHub) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(hub))
            .app_data(web::Data::new(TokenValidator::new(&get_auth_config())))
            .service(socket);
    }
}

fn upgrade_request(uri: &str) -> TestRequest {
    TestRequest::get()
        .uri(uri)
        .insert_header((header::UPGRADE, "websocket"))
        .insert_header((header::CONNECTION, "Upgrade"))
        .insert_header((header::SEC_WEBSOCKET_VERSION, "13"))
        .insert_header((header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ=="))
}

#[actix_web::test]
async fn sockets_need_a_token() {
    let hub = EventHub::new();
    let (status, body) = send_request(upgrade_request("/socket"), None, configure(hub.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token was provided"), "was: {body}");

    let (status, _) = send_request(upgrade_request("/socket?token=garbage"), None, configure(hub.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(hub.session_count(), 0);
}

#[actix_web::test]
async fn plain_requests_are_not_upgraded() {
    let hub = EventHub::new();
    let token = token_for("alice", Role::Customer);
    let (status, _) = send_request(TestRequest::get().uri("/socket"), Some(&token), configure(hub.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // The hub session made during the handshake is dropped again
    assert_eq!(hub.session_count(), 0);
}
