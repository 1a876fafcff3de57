use fdp_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        DeliveryLocation,
        LineItem,
        Order,
        OrderStatus,
        PaymentMethod,
        PaymentStatus,
        RestaurantEntry,
        Role,
        UserSummary,
    },
    lifecycle::StatusChange,
};

/// The identity behind a request, as established by the server's authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new<S: Into<String>>(user_id: S, role: Role) -> Self {
        Self { user_id: user_id.into(), role, name: None, email: None }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// A summary suitable for the participant store, if the token carried a display name.
    pub fn summary(&self) -> Option<UserSummary> {
        self.name.as_ref().map(|name| UserSummary {
            id: self.user_id.clone(),
            name: name.clone(),
            email: self.email.clone(),
            phone: None,
            role: self.role,
        })
    }
}

/// Clients send either a bare restaurant id or a full entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RestaurantInput {
    Id(String),
    Entry(RestaurantEntry),
}

impl From<RestaurantInput> for RestaurantEntry {
    fn from(value: RestaurantInput) -> Self {
        match value {
            RestaurantInput::Id(restaurant_id) => {
                RestaurantEntry { restaurant_id, name: None, items: Vec::new(), subtotal: None }
            },
            RestaurantInput::Entry(entry) => entry,
        }
    }
}

/// Client-supplied pricing. Any `total` sent by the client is ignored and recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingInput {
    pub subtotal: Option<Money>,
    pub delivery_fee: Option<Money>,
    pub total: Option<Money>,
}

/// The body of a create-order request, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacement {
    pub restaurants: Option<Vec<RestaurantInput>>,
    pub items: Option<Vec<LineItem>>,
    pub pricing: Option<PricingInput>,
    pub delivery_location: Option<DeliveryLocation>,
    /// Copied to `delivery_location` when that is absent
    pub delivery_address: Option<DeliveryLocation>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

/// A partial update to an order. Fields that are absent are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    #[serde(alias = "deliveryPerson")]
    pub delivery_person_id: Option<String>,
    pub delivery_location: Option<DeliveryLocation>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
    pub items: Option<Vec<LineItem>>,
    pub pricing: Option<PricingInput>,
    /// The revision the client last saw. If set, the update is rejected when the order has moved on.
    pub revision: Option<i64>,
    /// Set the status without checking the status sequence. Superadmins only.
    #[serde(default)]
    pub override_transition: bool,
}

impl OrderUpdate {
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_revision(mut self, revision: i64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() &&
            self.notes.is_none() &&
            self.delivery_person_id.is_none() &&
            self.delivery_location.is_none() &&
            self.payment_method.is_none() &&
            self.payment_status.is_none() &&
            self.items.is_none() &&
            self.pricing.is_none()
    }
}

/// What happened after the database write. The write itself always succeeded if you are looking at one of these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffects {
    pub persisted: bool,
    /// A job was accepted by a real queue backend
    pub queued: bool,
    /// Every real-time publish for this change went through
    pub notified: bool,
}

impl SideEffects {
    pub fn persisted() -> Self {
        Self { persisted: true, queued: false, notified: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order: Order,
    pub side_effects: SideEffects,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedOrder {
    pub order: Order,
    pub side_effects: SideEffects,
    pub status_change: StatusChange,
}
