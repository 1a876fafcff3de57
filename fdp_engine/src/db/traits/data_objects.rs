use chrono::{DateTime, Utc};

use crate::db_types::{Order, OrderStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOrderResult {
    Updated(Order),
    /// The stored order has moved on since the caller read it. Carries the current revision.
    StaleRevision(i64),
    NotFound,
}

/// Criteria for order searches. All criteria that are set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQueryFilter {
    pub customer_id: Option<String>,
    pub restaurant_id: Option<String>,
    pub delivery_person_id: Option<String>,
    /// Matches orders where this id is the customer, the restaurant or the delivery partner.
    pub participant: Option<String>,
    pub statuses: Vec<OrderStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_customer_id<S: Into<String>>(mut self, customer_id: S) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_restaurant_id<S: Into<String>>(mut self, restaurant_id: S) -> Self {
        self.restaurant_id = Some(restaurant_id.into());
        self
    }

    pub fn with_delivery_person_id<S: Into<String>>(mut self, delivery_person_id: S) -> Self {
        self.delivery_person_id = Some(delivery_person_id.into());
        self
    }

    pub fn with_participant<S: Into<String>>(mut self, user_id: S) -> Self {
        self.participant = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() &&
            self.restaurant_id.is_none() &&
            self.delivery_person_id.is_none() &&
            self.participant.is_none() &&
            self.statuses.is_empty() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}
