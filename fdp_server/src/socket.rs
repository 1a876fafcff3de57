//! The real-time websocket endpoint.
//!
//! Clients authenticate during the handshake, with the access token either in a `token` query parameter (browsers
//! cannot set headers on websocket requests) or in an `Authorization: Bearer` header. A request without a valid token
//! is refused with a 401 and never upgraded.
//!
//! Once connected, the session receives every [`ServerEvent`] published to its user room, its role room, and any order
//! rooms it has joined. Client messages are JSON:
//! * `{"event": "join", "orderId": 12}`
//! * `{"event": "leave", "orderId": 12}`
//! * `{"event": "ping"}`, answered with `{"event": "pong"}`
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_ws::{CloseCode, CloseReason, Message, MessageStream, Session};
use fdp_engine::realtime::{ClientMessage, EventHub, HubSession, ServerEvent, SessionId};
use futures::StreamExt;
use log::*;
use serde::Deserialize;

use crate::{
    auth::{bearer_token, TokenValidator},
    errors::{AuthError, ServerError},
};

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
}

#[get("/socket")]
pub async fn socket(
    req: HttpRequest,
    body: web::Payload,
    params: web::Query<SocketParams>,
    hub: web::Data<EventHub>,
    validator: web::Data<TokenValidator>,
) -> Result<HttpResponse, Error> {
    let token = params.token.as_deref().or_else(|| bearer_token(req.headers())).ok_or(AuthError::MissingToken)?;
    let claims = validator.validate(token)?;
    let hub_session = hub.connect(&claims.sub, claims.role).map_err(|e| {
        warn!("📡️ Could not register a real-time session for {}. {e}", claims.sub);
        ServerError::ServiceUnavailable(e.to_string())
    })?;
    let (response, session, stream) = match actix_ws::handle(&req, body) {
        Ok(parts) => parts,
        Err(e) => {
            debug!("📡️ Websocket handshake for {} failed. {e}", claims.sub);
            let _ = hub.disconnect(hub_session.id);
            return Err(e);
        },
    };
    info!("📡️ {} ({}) connected as session {}", claims.sub, claims.role, hub_session.id);
    actix_web::rt::spawn(run_session(hub.get_ref().clone(), hub_session, session, stream));
    Ok(response)
}

async fn run_session(hub: EventHub, hub_session: HubSession, mut session: Session, mut stream: MessageStream) {
    let HubSession { id, mut receiver } = hub_session;
    let reason = loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Some(event) => {
                    if send_event(&mut session, &event).await.is_err() {
                        break None;
                    }
                },
                // The hub dropped this session, most likely because it is shutting down
                None => break Some(CloseReason::from(CloseCode::Away)),
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_client_message(&hub, id, &text) {
                        if send_event(&mut session, &reply).await.is_err() {
                            break None;
                        }
                    }
                },
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                },
                Some(Ok(Message::Close(reason))) => break reason,
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    debug!("📡️ Protocol error on session {id}. {e}");
                    break Some(CloseReason::from(CloseCode::Protocol));
                },
                None => break None,
            },
        }
    };
    if let Err(e) = hub.disconnect(id) {
        warn!("📡️ Could not remove session {id} from the hub. {e}");
    }
    let _ = session.close(reason).await;
    debug!("📡️ Session {id} closed");
}

async fn send_event(session: &mut Session, event: &ServerEvent) -> Result<(), actix_ws::Closed> {
    match serde_json::to_string(event) {
        Ok(json) => session.text(json).await,
        Err(e) => {
            error!("📡️ Could not serialize {} event. {e}", event.name());
            Ok(())
        },
    }
}

/// Applies a client message to the hub and returns the reply, if any.
pub fn handle_client_message(hub: &EventHub, session: SessionId, text: &str) -> Option<ServerEvent> {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => return Some(ServerEvent::error(format!("Unrecognised message. {e}"))),
    };
    let result = match msg {
        ClientMessage::Join { order_id } => hub.join_order(session, order_id),
        ClientMessage::Leave { order_id } => hub.leave_order(session, order_id),
        ClientMessage::Ping => return Some(ServerEvent::Pong),
    };
    result.err().map(|e| ServerEvent::error(e.to_string()))
}
