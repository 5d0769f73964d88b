//! Order validation, lifecycle and service.

mod lifecycle;
mod service;
mod validation;

pub use lifecycle::OrderLifecycle;
pub use service::OrderService;
pub use validation::{
    ValidationError, Violation, check_total, validate_changes, validate_import, validate_order,
};
