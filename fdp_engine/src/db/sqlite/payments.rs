use chrono::{DateTime, Utc};
use fdp_common::Money;
use log::*;
use serde_json::Value;
use sqlx::{types::Json, FromRow, SqliteConnection};

use super::SqliteDatabaseError;
use crate::db_types::{NewPayment, OrderId, Payment, PaymentMethod, TransactionStatus};

const PAYMENT_COLUMNS: &str =
    "id, order_id, amount, method, status, transaction_id, gateway_metadata, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: i64,
    order_id: OrderId,
    amount: Money,
    method: PaymentMethod,
    status: TransactionStatus,
    transaction_id: Option<String>,
    gateway_metadata: Option<Json<Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            amount: row.amount,
            method: row.method,
            status: row.status,
            transaction_id: row.transaction_id,
            gateway_metadata: row.gateway_metadata.map(|j| j.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, SqliteDatabaseError> {
    let sql = format!(
        r#"
        INSERT INTO payments (order_id, amount, method, status, transaction_id, gateway_metadata, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING {PAYMENT_COLUMNS}
        "#
    );
    let txid = payment.transaction_id.clone().unwrap_or_default();
    let row: PaymentRow = sqlx::query_as(&sql)
        .bind(payment.order_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(payment.status)
        .bind(payment.transaction_id)
        .bind(payment.gateway_metadata.map(Json))
        .bind(Utc::now())
        .fetch_one(conn)
        .await
        .map_err(|e| SqliteDatabaseError::or_duplicate(e, || SqliteDatabaseError::DuplicatePayment(txid)))?;
    trace!("🗃️ Inserted {} payment {} for order {}", row.method, row.id, row.order_id);
    Ok(row.into())
}

pub async fn fetch_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SqliteDatabaseError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = $1");
    let row: Option<PaymentRow> = sqlx::query_as(&sql).bind(transaction_id).fetch_optional(conn).await?;
    Ok(row.map(Payment::from))
}

pub async fn fetch_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<Payment>, SqliteDatabaseError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 ORDER BY id ASC");
    let rows: Vec<PaymentRow> = sqlx::query_as(&sql).bind(order_id).fetch_all(conn).await?;
    Ok(rows.into_iter().map(Payment::from).collect())
}

pub async fn update_status(
    transaction_id: &str,
    status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SqliteDatabaseError> {
    let sql = format!(
        "UPDATE payments SET status = $1, updated_at = $2 WHERE transaction_id = $3 RETURNING {PAYMENT_COLUMNS}"
    );
    let row: Option<PaymentRow> =
        sqlx::query_as(&sql).bind(status).bind(Utc::now()).bind(transaction_id).fetch_optional(conn).await?;
    Ok(row.map(Payment::from))
}
