//! #  Database management and control.
//!
//! This module defines the interface contracts that an order store *backend* must satisfy. The engine APIs are generic
//! over these traits and never talk to a database directly.
//!
//! * [`OrderManagement`] creates, queries, updates and deletes orders. Updates are guarded by the order's `revision`
//!   so that two writers cannot silently overwrite each other.
//! * [`PaymentManagement`] records payment transactions and settles them against orders.
//! * [`ParticipantManagement`] stores the users and restaurants that orders refer to, so that order queries can expand
//!   participant references into summaries.
//! * [`OrderStore`] is shorthand for a backend that does all three.
mod data_objects;
mod order_management;
mod participant_management;
mod payment_management;

pub use data_objects::{OrderQueryFilter, UpdateOrderResult};
pub use order_management::OrderManagement;
pub use participant_management::ParticipantManagement;
pub use payment_management::PaymentManagement;

pub trait OrderStore: OrderManagement + PaymentManagement + ParticipantManagement {}

impl<T> OrderStore for T where T: OrderManagement + PaymentManagement + ParticipantManagement {}
