use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_memory_pool, new_pool, orders, participants, payments, SqliteDatabaseError};
use crate::{
    db::traits::{OrderManagement, OrderQueryFilter, ParticipantManagement, PaymentManagement, UpdateOrderResult},
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
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `FDP_DATABASE_URL`, or the default file database.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        Self::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// A fresh, fully migrated in-memory database. Everything is lost when the last clone is dropped.
    pub async fn new_in_memory() -> Result<Self, SqliteDatabaseError> {
        let pool = new_memory_pool().await?;
        let db = Self { url: "sqlite::memory:".to_string(), pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl OrderManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn insert_order(&self, order: NewOrder) -> Result<Order, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_number, order.id);
        Ok(order)
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_details(&self, id: OrderId) -> Result<Option<OrderDetails>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = orders::fetch_order(id, &mut conn).await? else {
            return Ok(None);
        };
        let mut details = orders::expand_orders(vec![order], &mut conn).await?;
        Ok(details.pop())
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<OrderDetails>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let found = orders::search_orders(filter, &mut conn).await?;
        orders::expand_orders(found, &mut conn).await
    }

    async fn update_order(&self, order: &Order, expected_revision: i64) -> Result<UpdateOrderResult, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        trace!("🗃️ Order {} updating from revision {expected_revision}", order.id);
        orders::update_order(order, expected_revision, &mut conn).await
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let deleted = orders::delete_order(id, &mut conn).await?;
        if deleted {
            debug!("🗃️ Order {id} has been deleted. Its payment records are kept");
        }
        Ok(deleted)
    }
}

impl PaymentManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(payment, &mut conn).await
    }

    async fn fetch_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_by_transaction_id(transaction_id, &mut conn).await
    }

    async fn fetch_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_for_order(order_id, &mut conn).await
    }

    async fn update_payment_status(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
    ) -> Result<Option<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::update_status(transaction_id, status, &mut conn).await?;
        if payment.is_some() {
            debug!("🗃️ Payment [{transaction_id}] is now {status}");
        }
        Ok(payment)
    }

    async fn update_order_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::update_payment_status(order_id, status, &mut conn).await
    }
}

impl ParticipantManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn upsert_user(&self, user: &UserSummary) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        participants::upsert_user(user, &mut conn).await
    }

    async fn upsert_restaurant(&self, restaurant: &RestaurantSummary) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        participants::upsert_restaurant(restaurant, &mut conn).await
    }

    async fn fetch_user(&self, id: &str) -> Result<Option<UserSummary>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        participants::fetch_user(id, &mut conn).await
    }

    async fn fetch_restaurant(&self, id: &str) -> Result<Option<RestaurantSummary>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        participants::fetch_restaurant(id, &mut conn).await
    }
}
