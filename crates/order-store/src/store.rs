use async_trait::async_trait;
use common::{NewOrder, Order, OrderChanges, OrderId, OrderStatus};

use crate::{OrderStoreError, Result};

/// Options for updating a stored order.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Status the order must currently have for the update to apply.
    /// If None, the update is unconditional.
    pub expected_status: Option<OrderStatus>,
}

impl UpdateOptions {
    /// Creates options with no status check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options that only apply the update while the order is in `status`.
    pub fn expect_status(status: OrderStatus) -> Self {
        Self {
            expected_status: Some(status),
        }
    }
}

/// Core trait for order store implementations.
///
/// The store is the only owner of the canonical order collection. All
/// implementations must be thread-safe (Send + Sync) and must serialize
/// mutations of the same order.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order under a freshly assigned id.
    ///
    /// Sets `order_time` and `updated_at` to now and stores the status as
    /// given, or `Pending` if none was given. Ids are never reused.
    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Persists an order that already carries an id.
    ///
    /// Fails with `DuplicateId` if the id is taken.
    async fn import(&self, order: Order) -> Result<Order>;

    /// Retrieves every stored order. No ordering is guaranteed.
    async fn get_all(&self) -> Result<Vec<Order>>;

    /// Retrieves one order.
    ///
    /// Returns None if the order doesn't exist.
    async fn get_by_id(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Shallow-merges `changes` over the stored order and persists it.
    ///
    /// Fails with `NotFound` if the order doesn't exist, and with
    /// `StatusConflict` if `options.expected_status` is set and doesn't
    /// match the stored status.
    async fn update(
        &self,
        id: &OrderId,
        changes: OrderChanges,
        options: UpdateOptions,
    ) -> Result<Order>;

    /// Removes an order permanently.
    ///
    /// Returns whether a record existed.
    async fn delete(&self, id: &OrderId) -> Result<bool>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Checks if an order exists.
    async fn exists(&self, id: &OrderId) -> Result<bool> {
        Ok(self.get_by_id(id).await?.is_some())
    }

    /// Retrieves every order currently in `status`.
    async fn get_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let orders = self.get_all().await?;
        Ok(orders.into_iter().filter(|o| o.status == status).collect())
    }

    /// Moves an order from `from` to `to`, failing if another writer got there first.
    async fn compare_and_set_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        self.update(
            id,
            OrderChanges::status(to),
            UpdateOptions::expect_status(from),
        )
        .await
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

/// Checks the stored status against the expectation in `options`.
pub fn check_expected_status(
    id: &OrderId,
    options: &UpdateOptions,
    actual: OrderStatus,
) -> Result<()> {
    match options.expected_status {
        Some(expected) if expected != actual => Err(OrderStoreError::StatusConflict {
            id: id.clone(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_update_accepts_any_status() {
        let id = OrderId::from_sequence(1);
        for status in OrderStatus::ALL {
            assert!(check_expected_status(&id, &UpdateOptions::new(), status).is_ok());
        }
    }

    #[test]
    fn expected_status_mismatch_is_a_conflict() {
        let id = OrderId::from_sequence(1);
        let options = UpdateOptions::expect_status(OrderStatus::Pending);

        assert!(check_expected_status(&id, &options, OrderStatus::Pending).is_ok());

        let err = check_expected_status(&id, &options, OrderStatus::Cancelled).unwrap_err();
        assert!(matches!(
            err,
            OrderStoreError::StatusConflict {
                expected: OrderStatus::Pending,
                actual: OrderStatus::Cancelled,
                ..
            }
        ));
    }
}
