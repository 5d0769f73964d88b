use common::{OrderId, OrderStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// No order is stored under the id.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// An imported order reused an id that is already taken.
    #[error("Order id already exists: {0}")]
    DuplicateId(OrderId),

    /// A conditional update found the order in a different status.
    #[error("Status conflict for order {id}: expected {expected}, found {actual}")]
    StatusConflict {
        id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row holds a value the order type cannot represent.
    #[error("Corrupt order record: {0}")]
    Corrupt(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
