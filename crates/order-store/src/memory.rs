use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{NewOrder, Order, OrderChanges, OrderId};
use tokio::sync::RwLock;

use crate::{
    OrderStoreError, Result,
    store::{OrderStore, UpdateOptions, check_expected_status},
};

#[derive(Default)]
struct Inner {
    orders: HashMap<OrderId, Order>,
    last_sequence: i64,
}

/// In-memory order store implementation.
///
/// Every mutation runs under a single write lock, so id assignment and
/// conditional updates are atomic. Clones share the same collection;
/// separate `new()` calls are fully isolated.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Removes all orders. The id sequence is not reset.
    pub async fn clear(&self) {
        self.inner.write().await.orders.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    #[tracing::instrument(skip(self, order))]
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let mut inner = self.inner.write().await;

        // Skip codes already taken by imported orders
        let id = loop {
            inner.last_sequence += 1;
            let candidate = OrderId::from_sequence(inner.last_sequence);
            if !inner.orders.contains_key(&candidate) {
                break candidate;
            }
        };

        let order = order.into_order(id.clone(), Utc::now());
        inner.orders.insert(id, order.clone());
        Ok(order)
    }

    #[tracing::instrument(skip(self, order), fields(id = %order.id))]
    async fn import(&self, order: Order) -> Result<Order> {
        let mut inner = self.inner.write().await;

        if inner.orders.contains_key(&order.id) {
            return Err(OrderStoreError::DuplicateId(order.id));
        }
        if let Some(sequence) = order.id.sequence() {
            inner.last_sequence = inner.last_sequence.max(sequence);
        }

        inner.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.values().cloned().collect())
    }

    async fn get_by_id(&self, id: &OrderId) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(id).cloned())
    }

    #[tracing::instrument(skip(self, changes))]
    async fn update(
        &self,
        id: &OrderId,
        changes: OrderChanges,
        options: UpdateOptions,
    ) -> Result<Order> {
        let mut inner = self.inner.write().await;

        let order = inner
            .orders
            .get_mut(id)
            .ok_or_else(|| OrderStoreError::NotFound(id.clone()))?;

        check_expected_status(id, &options, order.status)?;

        order.merge(changes, Utc::now());
        Ok(order.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &OrderId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.orders.remove(id).is_some())
    }
}
