//! Domain layer for the cafeteria order service.
//!
//! This crate provides:
//! - Validation of untyped order input into typed orders
//! - The order lifecycle controller (guarded status transitions)
//! - `OrderService`, the facade the HTTP layer calls

pub mod error;
pub mod order;

pub use common::{
    Money, NewOrder, Order, OrderChanges, OrderId, OrderItem, OrderStatus, PaymentStatus,
};
pub use error::DomainError;
pub use order::{
    OrderLifecycle, OrderService, ValidationError, Violation, validate_changes, validate_import,
    validate_order,
};
