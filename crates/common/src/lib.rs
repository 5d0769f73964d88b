//! Order entity and value types shared across the workspace.

pub mod money;
pub mod order;
pub mod status;
pub mod types;

pub use money::Money;
pub use order::{
    DEFAULT_PAYMENT_METHOD, NewOrder, Order, OrderChanges, OrderItem, items_total,
};
pub use status::{OrderStatus, ParseStatusError, PaymentStatus};
pub use types::OrderId;
