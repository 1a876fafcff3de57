use std::fmt::Display;

use fdp_engine::{
    db_types::{Order, OrderDetails, OrderId, OrderStatus},
    order_objects::{PlacedOrder, SideEffects, UpdatedOrder},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The response to a successful create-order request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub order_number: String,
    pub data: Order,
    pub side_effects: SideEffects,
}

impl From<PlacedOrder> for OrderCreatedResponse {
    fn from(placed: PlacedOrder) -> Self {
        let PlacedOrder { order, side_effects } = placed;
        Self { success: true, order_id: order.id, order_number: order.order_number.clone(), data: order, side_effects }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdatedResponse {
    pub success: bool,
    pub data: Order,
    pub side_effects: SideEffects,
}

impl From<UpdatedOrder> for OrderUpdatedResponse {
    fn from(updated: UpdatedOrder) -> Self {
        Self { success: true, data: updated.order, side_effects: updated.side_effects }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

pub type OrderListResponse = DataResponse<Vec<OrderDetails>>;

/// Query parameters for `GET /api/orders`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
}

/// Stripe only needs to know that the delivery arrived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub received: bool,
}

impl WebhookReceipt {
    pub fn received() -> Self {
        Self { received: true }
    }
}
