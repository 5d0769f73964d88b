//! Domain error types.

use common::{OrderId, OrderStatus};
use order_store::OrderStoreError;
use thiserror::Error;

use crate::order::ValidationError;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed validation; nothing was persisted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The order's status does not permit the requested transition.
    #[error("Invalid status transition for order {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Payment cannot be recorded for the order in its current state.
    #[error("Payment not allowed for order {id}: {reason}")]
    PaymentNotAllowed { id: OrderId, reason: &'static str },

    /// Completed and cancelled orders only accept payment status changes.
    #[error("Order {0} is closed and can no longer be edited")]
    OrderClosed(OrderId),

    /// The order's status changed while an edit was being applied.
    #[error("Order {0} was modified concurrently, reload and retry")]
    ConcurrentUpdate(OrderId),

    /// An imported order reused an existing id.
    #[error("Order id already exists: {0}")]
    DuplicateId(OrderId),

    /// An error occurred in the order store.
    #[error("Order store error: {0}")]
    Storage(OrderStoreError),
}

impl From<OrderStoreError> for DomainError {
    fn from(err: OrderStoreError) -> Self {
        match err {
            OrderStoreError::NotFound(id) => DomainError::NotFound(id),
            OrderStoreError::DuplicateId(id) => DomainError::DuplicateId(id),
            OrderStoreError::StatusConflict { id, .. } => DomainError::ConcurrentUpdate(id),
            other => DomainError::Storage(other),
        }
    }
}
