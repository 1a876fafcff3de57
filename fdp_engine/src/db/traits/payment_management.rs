use crate::db_types::{NewPayment, Order, OrderId, Payment, PaymentStatus, TransactionStatus};

#[allow(async_fn_in_trait)]
pub trait PaymentManagement: Clone {
    type Error: std::error::Error;

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, Self::Error>;

    async fn fetch_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>, Self::Error>;

    async fn fetch_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, Self::Error>;

    /// Sets the status of the payment carrying the given gateway transaction id. `None` means there is no such payment.
    async fn update_payment_status(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
    ) -> Result<Option<Payment>, Self::Error>;

    /// Sets the order-level payment status. This is a write to the order and bumps its revision.
    async fn update_order_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<Option<Order>, Self::Error>;
}
