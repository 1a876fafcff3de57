//! The order status state machine.
//!
//! An order moves forward one step at a time along
//! `placed → confirmed → preparing → ready → out_for_delivery → delivered`. It can be cancelled from any state that is
//! not already terminal. Setting an order to the status it already has is not an error, but it is not a change either,
//! and callers use [`StatusChange::Unchanged`] to skip the side effects of a transition.
use thiserror::Error;

use crate::db_types::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Changed { from: OrderStatus, to: OrderStatus },
}

impl StatusChange {
    pub fn is_change(&self) -> bool {
        matches!(self, StatusChange::Changed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Order is already {0} and can no longer change status")]
    Terminal(OrderStatus),
    #[error("Cannot move an order from {from} to {to}")]
    NotAllowed { from: OrderStatus, to: OrderStatus },
}

impl OrderStatus {
    /// The next step on the happy path, if there is one.
    pub fn next(&self) -> Option<OrderStatus> {
        use OrderStatus::*;
        match self {
            Placed => Some(Confirmed),
            Confirmed => Some(Preparing),
            Preparing => Some(Ready),
            Ready => Some(OutForDelivery),
            OutForDelivery => Some(Delivered),
            Delivered | Cancelled => None,
        }
    }

    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        check_transition(*self, to).is_ok()
    }
}

pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<StatusChange, TransitionError> {
    if from == to {
        return Ok(StatusChange::Unchanged);
    }
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }
    if to == OrderStatus::Cancelled || from.next() == Some(to) {
        Ok(StatusChange::Changed { from, to })
    } else {
        Err(TransitionError::NotAllowed { from, to })
    }
}

/// Skips the state machine. Only privileged callers should reach this.
pub fn force_transition(from: OrderStatus, to: OrderStatus) -> StatusChange {
    if from == to {
        StatusChange::Unchanged
    } else {
        StatusChange::Changed { from, to }
    }
}
