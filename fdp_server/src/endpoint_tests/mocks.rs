use fdp_engine::{
    db_types::{
        NewOrder,
        NewPayment,
        Order,
        OrderDetails,
        OrderId,
        Payment,
        PaymentStatus,
        RestaurantSummary,
        TransactionStatus,
        UserSummary,
    },
    OrderManagement,
    OrderQueryFilter,
    ParticipantManagement,
    PaymentManagement,
    UpdateOrderResult,
};
use mockall::mock;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Mock database error: {0}")]
pub struct MockDbError(pub String);

mock! {
    pub OrderStore {}
    impl Clone for OrderStore {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for OrderStore {
        type Error = MockDbError;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, MockDbError>;
        async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MockDbError>;
        async fn fetch_order_details(&self, id: OrderId) -> Result<Option<OrderDetails>, MockDbError>;
        async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<OrderDetails>, MockDbError>;
        async fn update_order(&self, order: &Order, expected_revision: i64) -> Result<UpdateOrderResult, MockDbError>;
        async fn delete_order(&self, id: OrderId) -> Result<bool, MockDbError>;
    }
    impl PaymentManagement for OrderStore {
        type Error = MockDbError;
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, MockDbError>;
        async fn fetch_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>, MockDbError>;
        async fn fetch_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, MockDbError>;
        async fn update_payment_status(&self, transaction_id: &str, status: TransactionStatus) -> Result<Option<Payment>, MockDbError>;
        async fn update_order_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> Result<Option<Order>, MockDbError>;
    }
    impl ParticipantManagement for OrderStore {
        type Error = MockDbError;
        async fn upsert_user(&self, user: &UserSummary) -> Result<(), MockDbError>;
        async fn upsert_restaurant(&self, restaurant: &RestaurantSummary) -> Result<(), MockDbError>;
        async fn fetch_user(&self, id: &str) -> Result<Option<UserSummary>, MockDbError>;
        async fn fetch_restaurant(&self, id: &str) -> Result<Option<RestaurantSummary>, MockDbError>;
    }
}

/// A store whose order queries all fail, as if the database had gone away.
pub fn failing_store() -> MockOrderStore {
    let mut store = MockOrderStore::new();
    store.expect_clone().returning(failing_store);
    store.expect_fetch_order_details().returning(|_| Err(MockDbError("connection refused".into())));
    store.expect_search_orders().returning(|_| Err(MockDbError("connection refused".into())));
    store.expect_fetch_order().returning(|_| Err(MockDbError("connection refused".into())));
    store
}

/// A store where `order` always loads, but some other writer has always saved a newer revision by the time we write.
pub fn racing_store(order: Order) -> MockOrderStore {
    let mut store = MockOrderStore::new();
    let copy = order.clone();
    store.expect_clone().returning(move || racing_store(copy.clone()));
    let current = order.revision + 1;
    store.expect_fetch_order().returning(move |_| Ok(Some(order.clone())));
    store.expect_update_order().returning(move |_, _| Ok(UpdateOrderResult::StaleRevision(current)));
    store
}
