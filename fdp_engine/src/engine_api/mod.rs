//! # Order lifecycle engine API
//!
//! The `engine_api` module exposes the programmatic API for the order lifecycle. It is split along the lines of the
//! two flows that change order state:
//!
//! * [`order_flow_api`] places, updates, reads and deletes orders, and hands status changes off to the job queues and
//!   the real-time hub.
//! * [`payment_flow_api`] records payment attempts and applies verified payment gateway webhooks.
//!
//! # API usage
//!
//! Both APIs are created by supplying a database backend that implements [`crate::OrderStore`], plus the side-effect
//! channels they should use:
//!
//! ```rust,ignore
//! use fdp_engine::{jobs::JobQueues, realtime::EventHub, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let hub = EventHub::new();
//! let api = OrderFlowApi::new(db, JobQueues::disabled(), Some(hub));
//! let placed = api.place_order(placement, Some(&customer)).await?;
//! ```
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_flow_api;
pub mod payment_objects;
