use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fdp_common::Money;
use log::*;
use sqlx::{types::Json, FromRow, QueryBuilder, SqliteConnection};

use super::{participants, SqliteDatabaseError};
use crate::{
    db::traits::{OrderQueryFilter, UpdateOrderResult},
    db_types::{
        DeliveryLocation,
        LineItem,
        NewOrder,
        Order,
        OrderDetails,
        OrderId,
        OrderStatus,
        PaymentMethod,
        PaymentStatus,
        Pricing,
        RestaurantEntry,
        RestaurantSummary,
        UserSummary,
    },
};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, restaurant_id, delivery_person_id, items, subtotal, \
                             delivery_fee, total, status, payment_status, payment_method, delivery_location, \
                             multi_restaurant_data, notes, revision, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
    id: OrderId,
    order_number: String,
    customer_id: String,
    restaurant_id: String,
    delivery_person_id: Option<String>,
    items: Json<Vec<LineItem>>,
    subtotal: Money,
    delivery_fee: Money,
    total: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: Option<PaymentMethod>,
    delivery_location: Option<Json<DeliveryLocation>>,
    multi_restaurant_data: Option<Json<Vec<RestaurantEntry>>>,
    notes: Option<String>,
    revision: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            restaurant_id: row.restaurant_id,
            delivery_person_id: row.delivery_person_id,
            items: row.items.0,
            pricing: Pricing { subtotal: row.subtotal, delivery_fee: row.delivery_fee, total: row.total },
            status: row.status,
            payment_status: row.payment_status,
            payment_method: row.payment_method,
            delivery_location: row.delivery_location.map(|j| j.0),
            multi_restaurant_data: row.multi_restaurant_data.map(|j| j.0),
            notes: row.notes,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Inserts a new order in `placed` status at revision 0.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO orders (
            order_number, customer_id, restaurant_id, items, subtotal, delivery_fee, total, status, payment_status,
            payment_method, delivery_location, multi_restaurant_data, notes, revision, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0, $14, $14)
        RETURNING {ORDER_COLUMNS}
        "#
    );
    let order_number = order.order_number.clone();
    let row: OrderRow = sqlx::query_as(&sql)
        .bind(order.order_number)
        .bind(order.customer_id)
        .bind(order.restaurant_id)
        .bind(Json(order.items))
        .bind(order.pricing.subtotal)
        .bind(order.pricing.delivery_fee)
        .bind(order.pricing.total)
        .bind(OrderStatus::Placed)
        .bind(PaymentStatus::Pending)
        .bind(order.payment_method)
        .bind(order.delivery_location.map(Json))
        .bind(order.multi_restaurant_data.map(Json))
        .bind(order.notes)
        .bind(order.created_at)
        .fetch_one(conn)
        .await
        .map_err(|e| SqliteDatabaseError::or_duplicate(e, || SqliteDatabaseError::DuplicateOrder(order_number)))?;
    trace!("🗃️ Inserted order {} as {}", row.order_number, row.id);
    Ok(row.into())
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql).bind(id).fetch_optional(conn).await?;
    Ok(row.map(Order::from))
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in descending order
pub async fn search_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(customer_id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if let Some(restaurant_id) = query.restaurant_id {
        where_clause.push("restaurant_id = ");
        where_clause.push_bind_unseparated(restaurant_id);
    }
    if let Some(delivery_person_id) = query.delivery_person_id {
        where_clause.push("delivery_person_id = ");
        where_clause.push_bind_unseparated(delivery_person_id);
    }
    if let Some(user_id) = query.participant {
        where_clause.push("(customer_id = ");
        where_clause.push_bind_unseparated(user_id.clone());
        where_clause.push_unseparated(" OR restaurant_id = ");
        where_clause.push_bind_unseparated(user_id.clone());
        where_clause.push_unseparated(" OR delivery_person_id = ");
        where_clause.push_bind_unseparated(user_id);
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if !query.statuses.is_empty() {
        let status_clause = query.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<OrderRow>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", rows.len());
    Ok(rows.into_iter().map(Order::from).collect())
}

/// Writes the mutable fields of `order` back to the database, provided nobody else has written to it since
/// `expected_revision`.
pub async fn update_order(
    order: &Order,
    expected_revision: i64,
    conn: &mut SqliteConnection,
) -> Result<UpdateOrderResult, SqliteDatabaseError> {
    let sql = format!(
        r#"
        UPDATE orders SET
            restaurant_id = $1, delivery_person_id = $2, items = $3, subtotal = $4, delivery_fee = $5, total = $6,
            status = $7, payment_status = $8, payment_method = $9, delivery_location = $10,
            multi_restaurant_data = $11, notes = $12, revision = revision + 1, updated_at = $13
        WHERE id = $14 AND revision = $15
        RETURNING {ORDER_COLUMNS}
        "#
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
        .bind(order.restaurant_id.as_str())
        .bind(order.delivery_person_id.as_deref())
        .bind(Json(&order.items))
        .bind(order.pricing.subtotal)
        .bind(order.pricing.delivery_fee)
        .bind(order.pricing.total)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_method)
        .bind(order.delivery_location.as_ref().map(Json))
        .bind(order.multi_restaurant_data.as_ref().map(Json))
        .bind(order.notes.as_deref())
        .bind(Utc::now())
        .bind(order.id)
        .bind(expected_revision)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(row) = row {
        trace!("🗃️ Order {} is now at revision {}", row.id, row.revision);
        return Ok(UpdateOrderResult::Updated(row.into()));
    }
    let current: Option<i64> =
        sqlx::query_scalar("SELECT revision FROM orders WHERE id = $1").bind(order.id).fetch_optional(conn).await?;
    match current {
        Some(revision) => {
            debug!("🗃️ Order {} was not updated. Expected revision {expected_revision}, found {revision}", order.id);
            Ok(UpdateOrderResult::StaleRevision(revision))
        },
        None => Ok(UpdateOrderResult::NotFound),
    }
}

pub async fn update_payment_status(
    id: OrderId,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!(
        "UPDATE orders SET payment_status = $1, revision = revision + 1, updated_at = $2 WHERE id = $3 RETURNING \
         {ORDER_COLUMNS}"
    );
    let row: Option<OrderRow> =
        sqlx::query_as(&sql).bind(status).bind(Utc::now()).bind(id).fetch_optional(conn).await?;
    Ok(row.map(Order::from))
}

/// Hard-deletes the order row. Payments that reference it are left alone.
pub async fn delete_order(id: OrderId, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Looks up the participant summaries for each order. Summaries are cached for the duration of the call, since a
/// listing usually repeats the same few restaurants and customers.
pub async fn expand_orders(
    orders: Vec<Order>,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderDetails>, SqliteDatabaseError> {
    let mut users: HashMap<String, Option<UserSummary>> = HashMap::new();
    let mut restaurants: HashMap<String, Option<RestaurantSummary>> = HashMap::new();
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        let customer = cached_user(&order.customer_id, &mut users, conn).await?;
        let delivery_person = match order.delivery_person_id.as_deref() {
            Some(id) => cached_user(id, &mut users, conn).await?,
            None => None,
        };
        let restaurant = match restaurants.get(&order.restaurant_id) {
            Some(r) => r.clone(),
            None => {
                let r = participants::fetch_restaurant(&order.restaurant_id, conn).await?;
                restaurants.insert(order.restaurant_id.clone(), r.clone());
                r
            },
        };
        result.push(OrderDetails { order, customer, restaurant, delivery_person });
    }
    Ok(result)
}

async fn cached_user(
    id: &str,
    cache: &mut HashMap<String, Option<UserSummary>>,
    conn: &mut SqliteConnection,
) -> Result<Option<UserSummary>, SqliteDatabaseError> {
    if let Some(user) = cache.get(id) {
        return Ok(user.clone());
    }
    let user = participants::fetch_user(id, conn).await?;
    cache.insert(id.to_string(), user.clone());
    Ok(user)
}
