use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatus, PaymentStatus, Role};

/// The room that monitoring dashboards listen on. Always equal to `role_room(Role::SuperAdmin)`.
pub const SUPERADMIN_ROOM: &str = "role:superadmin";

/// The room every session of `user_id` sits in.
pub fn user_room(user_id: &str) -> String {
    format!("user:{user_id}")
}

pub fn role_room(role: Role) -> String {
    format!("role:{}", role.as_str())
}

/// Everything the server pushes to real-time clients. Serialized as `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "order:update")]
    OrderUpdate(OrderUpdateEvent),
    #[serde(rename = "newOrder")]
    NewOrder(NewOrderEvent),
    #[serde(rename = "orderStatusChange")]
    OrderStatusChange(StatusChangeEvent),
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error(ClientErrorEvent),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::OrderUpdate(_) => "order:update",
            ServerEvent::NewOrder(_) => "newOrder",
            ServerEvent::OrderStatusChange(_) => "orderStatusChange",
            ServerEvent::Pong => "pong",
            ServerEvent::Error(_) => "error",
        }
    }

    pub fn order_update(order: &Order) -> Self {
        ServerEvent::OrderUpdate(OrderUpdateEvent {
            order_id: order.id,
            status: order.status,
            payment_status: None,
        })
    }

    /// An order update that also reports the order's payment status.
    pub fn payment_update(order: &Order) -> Self {
        ServerEvent::OrderUpdate(OrderUpdateEvent {
            order_id: order.id,
            status: order.status,
            payment_status: Some(order.payment_status),
        })
    }

    pub fn new_order(order: &Order) -> Self {
        ServerEvent::NewOrder(NewOrderEvent { order: order.clone(), timestamp: Utc::now() })
    }

    pub fn status_change(order: &Order, old_status: OrderStatus) -> Self {
        ServerEvent::OrderStatusChange(StatusChangeEvent {
            order_id: order.id,
            order_number: order.order_number.clone(),
            old_status,
            new_status: order.status,
            timestamp: Utc::now(),
        })
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        ServerEvent::Error(ClientErrorEvent { message: message.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdateEvent {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderEvent {
    pub order: Order,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeEvent {
    pub order_id: OrderId,
    pub order_number: String,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientErrorEvent {
    pub message: String,
}

/// Messages a connected client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "orderId")]
        order_id: OrderId,
    },
    Leave {
        #[serde(rename = "orderId")]
        order_id: OrderId,
    },
    Ping,
}
