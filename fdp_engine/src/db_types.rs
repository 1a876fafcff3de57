use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use fdp_common::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Type};
use thiserror::Error;

/// The customer id recorded against orders placed without an authenticated user.
pub const GUEST_CUSTOMER_ID: &str = "guest";

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The real-time room that carries updates for this order.
    pub fn room(&self) -> String {
        format!("order:{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self).map_err(|_| ConversionError::new("order id", s))
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------      OrderStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// The customer has submitted the order. Nobody has looked at it yet.
    Placed,
    /// The restaurant has accepted the order.
    Confirmed,
    Preparing,
    /// The food is ready for pickup by a delivery partner.
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Delivered and cancelled orders never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(Self::Placed),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError::new("order status", s)),
        }
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
/// Whether the order as a whole has been paid for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => f.write_str("pending"),
            PaymentStatus::Paid => f.write_str("paid"),
        }
    }
}

//--------------------------------------     PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    Wallet,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::Cash => f.write_str("cash"),
            PaymentMethod::Wallet => f.write_str("wallet"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "cash" => Ok(Self::Cash),
            "wallet" => Ok(Self::Wallet),
            s => Err(ConversionError::new("payment method", s)),
        }
    }
}

//--------------------------------------   TransactionStatus   ---------------------------------------------------------
/// The state of a single payment transaction.
///
/// `completed` is accepted on input as a synonym for `succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    #[serde(alias = "completed")]
    Succeeded,
    Failed,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => f.write_str("pending"),
            TransactionStatus::Succeeded => f.write_str("succeeded"),
            TransactionStatus::Failed => f.write_str("failed"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "succeeded" | "completed" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError::new("transaction status", s)),
        }
    }
}

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Restaurant,
    DeliveryPartner,
    Admin,
    #[sqlx(rename = "superadmin")]
    #[serde(rename = "superadmin")]
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Restaurant => "restaurant",
            Role::DeliveryPartner => "delivery_partner",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// A superadmin satisfies any requirement for `admin`. Every other role only satisfies itself.
    pub fn satisfies(&self, required: Role) -> bool {
        *self == required || (*self == Role::SuperAdmin && required == Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.satisfies(Role::Admin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "restaurant" => Ok(Self::Restaurant),
            "delivery_partner" => Ok(Self::DeliveryPartner),
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::SuperAdmin),
            s => Err(ConversionError::new("role", s)),
        }
    }
}

//--------------------------------------       LineItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// The menu item being ordered
    #[serde(alias = "productId", alias = "menuItem")]
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: u32,
    /// Unit price in minor units
    pub price: Money,
}

impl LineItem {
    /// `None` if the line total does not fit in an `i64`.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(i64::from(self.quantity))
    }
}

//--------------------------------------        Pricing        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl Pricing {
    /// Computes the total. Returns `None` if it would overflow.
    pub fn new(subtotal: Money, delivery_fee: Money) -> Option<Self> {
        let total = subtotal.checked_add(delivery_fee)?;
        Some(Self { subtotal, delivery_fee, total })
    }

    pub fn is_consistent(&self) -> bool {
        self.subtotal.checked_add(self.delivery_fee) == Some(self.total)
    }
}

//--------------------------------------   DeliveryLocation    ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLocation {
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

//--------------------------------------    RestaurantEntry    ---------------------------------------------------------
/// One restaurant's share of a (possibly multi-restaurant) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantEntry {
    #[serde(alias = "restaurant")]
    pub restaurant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Money>,
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Human-readable identifier, `ORD-<unix millis>-<4 digits>`
    pub order_number: String,
    pub customer_id: String,
    /// The primary restaurant. For multi-restaurant orders this is the first entry.
    pub restaurant_id: String,
    pub delivery_person_id: Option<String>,
    pub items: Vec<LineItem>,
    pub pricing: Pricing,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub delivery_location: Option<DeliveryLocation>,
    pub multi_restaurant_data: Option<Vec<RestaurantEntry>>,
    pub notes: Option<String>,
    /// Incremented on every write. Used to detect concurrent modification.
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// True if the given user is the customer, the primary restaurant or the assigned delivery partner.
    pub fn involves(&self, user_id: &str) -> bool {
        self.customer_id == user_id ||
            self.restaurant_id == user_id ||
            self.delivery_person_id.as_deref() == Some(user_id)
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// A validated order, ready to be written to the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: String,
    pub restaurant_id: String,
    pub items: Vec<LineItem>,
    pub pricing: Pricing,
    pub payment_method: Option<PaymentMethod>,
    pub delivery_location: Option<DeliveryLocation>,
    pub multi_restaurant_data: Option<Vec<RestaurantEntry>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    /// The gateway's identifier for this payment (e.g. a Stripe payment intent id)
    pub transaction_id: Option<String>,
    pub gateway_metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub transaction_id: Option<String>,
    pub gateway_metadata: Option<Value>,
}

impl NewPayment {
    pub fn new(order_id: OrderId, amount: Money, method: PaymentMethod) -> Self {
        Self {
            order_id,
            amount,
            method,
            status: TransactionStatus::Pending,
            transaction_id: None,
            gateway_metadata: None,
        }
    }

    pub fn with_transaction_id<S: Into<String>>(mut self, transaction_id: S) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.gateway_metadata = Some(metadata);
        self
    }
}

//--------------------------------------     Participants      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

//--------------------------------------     OrderDetails      ---------------------------------------------------------
/// An order with its participant references expanded into summaries.
///
/// References that do not resolve to a stored participant are left as `None`; the raw ids are still available on the
/// order itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<UserSummary>,
    pub restaurant: Option<RestaurantSummary>,
    pub delivery_person: Option<UserSummary>,
}

impl OrderDetails {
    pub fn unexpanded(order: Order) -> Self {
        Self { order, customer: None, restaurant: None, delivery_person: None }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_strings() {
        assert_eq!(OrderStatus::OutForDelivery.to_string(), "out_for_delivery");
        assert_eq!("out_for_delivery".parse::<OrderStatus>().unwrap(), OrderStatus::OutForDelivery);
        assert!("shipped".parse::<OrderStatus>().is_err());
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
    }

    #[test]
    fn completed_is_an_alias_for_succeeded() {
        let status: TransactionStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, TransactionStatus::Succeeded);
        assert_eq!("completed".parse::<TransactionStatus>().unwrap(), TransactionStatus::Succeeded);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"succeeded\"");
    }

    #[test]
    fn superadmin_satisfies_admin() {
        assert!(Role::SuperAdmin.satisfies(Role::Admin));
        assert!(Role::SuperAdmin.satisfies(Role::SuperAdmin));
        assert!(!Role::Admin.satisfies(Role::SuperAdmin));
        assert!(!Role::Customer.satisfies(Role::Admin));
        let role: Role = serde_json::from_str("\"superadmin\"").unwrap();
        assert_eq!(role, Role::SuperAdmin);
        let role: Role = serde_json::from_str("\"delivery_partner\"").unwrap();
        assert_eq!(role, Role::DeliveryPartner);
    }

    #[test]
    fn line_items_accept_legacy_product_keys() {
        let item: LineItem = serde_json::from_str(r#"{"productId": "burger", "quantity": 2, "price": 550}"#).unwrap();
        assert_eq!(item.product, "burger");
        assert_eq!(item.line_total(), Some(Money::from(1100)));
        let huge = LineItem { quantity: 2, price: Money::from(i64::MAX), ..item };
        assert_eq!(huge.line_total(), None);
    }

    #[test]
    fn pricing_total() {
        let pricing = Pricing::new(Money::from(1500), Money::from(4000)).unwrap();
        assert_eq!(pricing.total, Money::from(5500));
        assert!(pricing.is_consistent());
        let bad = Pricing { total: Money::from(1), ..pricing };
        assert!(!bad.is_consistent());
        assert!(Pricing::new(Money::from(i64::MAX), Money::from(1)).is_none());
        let wrapped = Pricing { subtotal: Money::from(i64::MAX), delivery_fee: Money::from(1), total: Money::from(i64::MIN) };
        assert!(!wrapped.is_consistent());
    }

    #[test]
    fn order_id_room() {
        assert_eq!(OrderId(42).room(), "order:42");
        assert_eq!("42".parse::<OrderId>().unwrap(), OrderId(42));
    }
}
