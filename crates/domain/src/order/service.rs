//! Order service providing the operations the API exposes.

use common::{Order, OrderId, OrderStatus};
use order_store::{OrderStore, OrderStoreExt};
use serde_json::Value;

use crate::error::DomainError;

use super::lifecycle::OrderLifecycle;
use super::validation::{validate_changes, validate_import, validate_order};

/// Service for managing orders.
///
/// Validates untyped input and routes every change to an existing order
/// through the lifecycle controller.
pub struct OrderService<S: OrderStore> {
    lifecycle: OrderLifecycle<S>,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            lifecycle: OrderLifecycle::new(store),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        self.lifecycle.store()
    }

    /// Returns the lifecycle controller.
    pub fn lifecycle(&self) -> &OrderLifecycle<S> {
        &self.lifecycle
    }

    /// Validates and persists a new order.
    #[tracing::instrument(skip(self, candidate))]
    pub async fn create(&self, candidate: &Value) -> Result<Order, DomainError> {
        let new_order = validate_order(candidate)?;
        let order = self.store().create(new_order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total, "order created");
        Ok(order)
    }

    /// Validates and persists an order that carries its own id.
    #[tracing::instrument(skip(self, candidate))]
    pub async fn import(&self, candidate: &Value) -> Result<Order, DomainError> {
        let order = validate_import(candidate)?;
        let order = self.store().import(order).await?;

        tracing::info!(order_id = %order.id, status = %order.status, "order imported");
        Ok(order)
    }

    /// Lists orders, oldest first, optionally only those in `status`.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, DomainError> {
        let mut orders = match status {
            Some(status) => self.store().get_by_status(status).await?,
            None => self.store().get_all().await?,
        };
        orders.sort_by(|a, b| a.order_time.cmp(&b.order_time).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    /// Loads an order by id.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn find(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.store().get_by_id(id).await?)
    }

    /// Loads an order by id, failing with `NotFound` if it doesn't exist.
    pub async fn get(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.find(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(id.clone()))
    }

    /// Applies a partial update.
    ///
    /// Field edits, `status` and `paymentStatus` are checked together and
    /// written in one guarded store update, so a rejected request leaves the
    /// order untouched.
    #[tracing::instrument(skip(self, candidate))]
    pub async fn update(&self, id: &OrderId, candidate: &Value) -> Result<Order, DomainError> {
        let changes = validate_changes(candidate, id)?;
        self.lifecycle.edit(id, changes).await
    }

    /// Deletes an order permanently.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &OrderId) -> Result<(), DomainError> {
        if !self.store().delete(id).await? {
            return Err(DomainError::NotFound(id.clone()));
        }

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    /// Staff accepts a pending order.
    pub async fn accept(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.lifecycle.accept(id).await
    }

    /// Staff rejects (cancels) an order.
    pub async fn reject(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.lifecycle.reject(id).await
    }

    /// Marks an order ready for pickup.
    pub async fn mark_ready(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.lifecycle.mark_ready(id).await
    }

    /// Marks an order as picked up.
    pub async fn complete(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.lifecycle.complete(id).await
    }

    /// Records that an order has been paid.
    pub async fn record_payment(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.lifecycle.record_payment(id).await
    }
}
