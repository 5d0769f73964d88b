//! Order store: the sole owner of persisted order state.
//!
//! One contract ([`OrderStore`]) with two backends: an in-memory map for
//! tests and single-process deployments, and PostgreSQL.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{NewOrder, Order, OrderChanges, OrderId, OrderStatus};
pub use error::{OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{OrderStore, OrderStoreExt, UpdateOptions};
