//! Food Delivery Platform order engine
//!
//! This library contains the order lifecycle logic for the food delivery platform. It knows nothing about HTTP; the
//! server crate wraps it.
//!
//! The library is divided into these main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`mod@engine_api`]). [`OrderFlowApi`] runs order placement and status updates, and
//!    [`PaymentFlowApi`] handles payments and gateway webhooks. Backends need to implement the traits re-exported here
//!    in order to act as a store for the APIs.
//! 3. The side-effect channels that the APIs feed: background [`jobs`] queues and the [`realtime`] event hub.
//!
//! Order statuses move through a fixed sequence, which lives in [`lifecycle`].
mod db;

pub mod db_types;
pub mod engine_api;
pub mod helpers;
pub mod jobs;
pub mod lifecycle;
pub mod realtime;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    OrderManagement,
    OrderQueryFilter,
    OrderStore,
    ParticipantManagement,
    PaymentManagement,
    UpdateOrderResult,
};
pub use engine_api::{
    errors::{OrderFlowError, PaymentFlowError},
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_flow_api::PaymentFlowApi,
    payment_objects,
};
