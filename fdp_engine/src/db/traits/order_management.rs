use crate::{
    db::traits::{OrderQueryFilter, UpdateOrderResult},
    db_types::{NewOrder, Order, OrderDetails, OrderId},
};

/// The `OrderManagement` trait defines the behaviour for storing and querying orders in the database backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    type Error: std::error::Error;

    /// Stores a new order in `placed` status with a pending payment status, and returns the stored record.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, Self::Error>;

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, Self::Error>;

    /// Fetches the order with the customer, restaurant and delivery partner expanded into summaries.
    async fn fetch_order_details(&self, id: OrderId) -> Result<Option<OrderDetails>, Self::Error>;

    /// Returns matching orders, newest first, with participant summaries expanded.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<OrderDetails>, Self::Error>;

    /// Writes `order` over the stored record if, and only if, the stored revision is still `expected_revision`.
    /// On success the revision is incremented and `updated_at` refreshed.
    async fn update_order(&self, order: &Order, expected_revision: i64) -> Result<UpdateOrderResult, Self::Error>;

    /// Removes the order. Payment records are never deleted. Returns false if there was no such order.
    async fn delete_order(&self, id: OrderId) -> Result<bool, Self::Error>;
}
