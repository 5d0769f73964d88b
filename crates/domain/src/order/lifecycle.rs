//! Order lifecycle controller.
//!
//! Guards every status and payment change against the rules on
//! [`OrderStatus`] and [`PaymentStatus`] and applies it, together with any
//! field edits, as one compare-and-set on the store. Two staff members acting
//! on the same order cannot both win, and a rejected request writes nothing.

use common::{Order, OrderChanges, OrderId, OrderStatus, PaymentStatus};
use order_store::{OrderStore, OrderStoreError, UpdateOptions};

use crate::error::DomainError;

use super::validation::check_total;

/// Whether asking for the value an order already has is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Reject,
    Allow,
}

/// Applies guarded status transitions to stored orders.
pub struct OrderLifecycle<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderLifecycle<S> {
    /// Creates a new lifecycle controller over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pending → Preparing.
    #[tracing::instrument(skip(self))]
    pub async fn accept(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.write(id, OrderChanges::status(OrderStatus::Preparing), Repeat::Reject)
            .await
    }

    /// Pending or Preparing → Cancelled. A paid order is marked refunded.
    #[tracing::instrument(skip(self))]
    pub async fn reject(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.write(id, OrderChanges::status(OrderStatus::Cancelled), Repeat::Reject)
            .await
    }

    /// Preparing → Ready.
    #[tracing::instrument(skip(self))]
    pub async fn mark_ready(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.write(id, OrderChanges::status(OrderStatus::Ready), Repeat::Reject)
            .await
    }

    /// Ready → Completed.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.write(id, OrderChanges::status(OrderStatus::Completed), Repeat::Reject)
            .await
    }

    /// Moves the order to `target` if the transition table allows it.
    ///
    /// Requesting the status the order already has succeeds without writing.
    #[tracing::instrument(skip(self))]
    pub async fn transition(&self, id: &OrderId, target: OrderStatus) -> Result<Order, DomainError> {
        self.write(id, OrderChanges::status(target), Repeat::Allow)
            .await
    }

    /// Unpaid → Paid. Not allowed once the order is cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment(&self, id: &OrderId) -> Result<Order, DomainError> {
        let changes = OrderChanges {
            payment_status: Some(PaymentStatus::Paid),
            ..OrderChanges::default()
        };
        self.write(id, changes, Repeat::Reject).await
    }

    /// Applies a validated partial update.
    ///
    /// `status` and `paymentStatus` follow the same rules as the dedicated
    /// operations, detail edits are refused on closed orders, and a `total`
    /// sent without `items` must match the stored items. Values equal to the
    /// stored ones are no-ops.
    #[tracing::instrument(skip(self, changes))]
    pub async fn edit(&self, id: &OrderId, changes: OrderChanges) -> Result<Order, DomainError> {
        self.write(id, changes, Repeat::Allow).await
    }

    async fn load(&self, id: &OrderId) -> Result<Order, DomainError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(id.clone()))
    }

    async fn write(
        &self,
        id: &OrderId,
        changes: OrderChanges,
        repeat: Repeat,
    ) -> Result<Order, DomainError> {
        // Every conflict means the status advanced, and the transition graph
        // is acyclic, so this terminates.
        loop {
            let current = self.load(id).await?;
            let planned = plan(&current, changes.clone(), repeat)?;
            if planned.is_empty() {
                return Ok(current);
            }

            match self
                .store
                .update(id, planned, UpdateOptions::expect_status(current.status))
                .await
            {
                Ok(order) => {
                    record(&current, &order);
                    return Ok(order);
                }
                Err(OrderStoreError::StatusConflict { actual, .. }) => {
                    tracing::debug!(order_id = %id, expected = %current.status, %actual, "status changed concurrently, retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Checks `changes` against `current` and returns what should be written.
fn plan(
    current: &Order,
    mut changes: OrderChanges,
    repeat: Repeat,
) -> Result<OrderChanges, DomainError> {
    let id = &current.id;

    if let (Some(total), None) = (changes.total, &changes.items) {
        check_total(total, &current.items)?;
    }
    if changes.touches_details() && current.is_terminal() {
        return Err(DomainError::OrderClosed(id.clone()));
    }

    let from = current.status;
    let status = match changes.status {
        Some(to) if to == from && repeat == Repeat::Allow => {
            changes.status = None;
            from
        }
        Some(to) if !from.can_transition_to(to) => {
            tracing::warn!(order_id = %id, %from, %to, "rejected status transition");
            return Err(DomainError::InvalidTransition {
                id: id.clone(),
                from,
                to,
            });
        }
        Some(to) => to,
        None => from,
    };

    match changes.payment_status {
        Some(to) if to == current.payment_status && repeat == Repeat::Allow => {
            changes.payment_status = None;
        }
        Some(to) => check_payment(id, status, current.payment_status, to)?,
        None => {}
    }

    if changes.status == Some(OrderStatus::Cancelled)
        && current.payment_status == PaymentStatus::Paid
    {
        changes.payment_status = Some(PaymentStatus::Refunded);
    }

    Ok(changes)
}

/// Payment rules: Unpaid → Paid while the order is not cancelled. Refunds
/// only happen by cancelling a paid order.
fn check_payment(
    id: &OrderId,
    status: OrderStatus,
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), DomainError> {
    let reason = match (from, to) {
        (PaymentStatus::Unpaid, PaymentStatus::Paid) if status == OrderStatus::Cancelled => {
            "order is cancelled"
        }
        (PaymentStatus::Unpaid, PaymentStatus::Paid) => return Ok(()),
        (PaymentStatus::Refunded, PaymentStatus::Paid) => "order was refunded",
        (_, PaymentStatus::Paid) => "order is already paid",
        (_, PaymentStatus::Refunded) => "refunds are issued by cancelling the order",
        (_, PaymentStatus::Unpaid) => "a recorded payment cannot be undone",
    };
    tracing::warn!(order_id = %id, %from, %to, reason, "rejected payment change");
    Err(DomainError::PaymentNotAllowed {
        id: id.clone(),
        reason,
    })
}

fn record(before: &Order, after: &Order) {
    if before.status != after.status {
        metrics::counter!(
            "order_transitions_total",
            "from" => before.status.as_str(),
            "to" => after.status.as_str()
        )
        .increment(1);
        tracing::info!(order_id = %after.id, from = %before.status, to = %after.status, "order status changed");
    }
    if before.payment_status != PaymentStatus::Paid && after.payment_status == PaymentStatus::Paid {
        metrics::counter!("order_payments_total").increment(1);
        tracing::info!(order_id = %after.id, "payment recorded");
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, NewOrder, OrderItem};
    use order_store::InMemoryOrderStore;

    use super::*;

    async fn setup() -> (OrderLifecycle<InMemoryOrderStore>, OrderId) {
        let store = InMemoryOrderStore::new();
        let order = store
            .create(NewOrder::from_items(vec![OrderItem::new(
                "Pancit Canton",
                1,
                Money::from_cents(6000),
            )]))
            .await
            .unwrap();
        (OrderLifecycle::new(store), order.id)
    }

    fn assert_invalid(result: Result<Order, DomainError>, from: OrderStatus, to: OrderStatus) {
        match result {
            Err(DomainError::InvalidTransition {
                from: actual_from,
                to: actual_to,
                ..
            }) => {
                assert_eq!(actual_from, from);
                assert_eq!(actual_to, to);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn happy_path_reaches_completed() {
        let (lifecycle, id) = setup().await;

        assert_eq!(
            lifecycle.accept(&id).await.unwrap().status,
            OrderStatus::Preparing
        );
        assert_eq!(
            lifecycle.mark_ready(&id).await.unwrap().status,
            OrderStatus::Ready
        );
        assert_eq!(
            lifecycle.complete(&id).await.unwrap().status,
            OrderStatus::Completed
        );
    }

    #[tokio::test]
    async fn accept_twice_fails() {
        let (lifecycle, id) = setup().await;
        lifecycle.accept(&id).await.unwrap();

        assert_invalid(
            lifecycle.accept(&id).await,
            OrderStatus::Preparing,
            OrderStatus::Preparing,
        );
    }

    #[tokio::test]
    async fn reject_from_preparing_but_not_from_ready() {
        let (lifecycle, id) = setup().await;
        lifecycle.accept(&id).await.unwrap();
        assert_eq!(
            lifecycle.reject(&id).await.unwrap().status,
            OrderStatus::Cancelled
        );

        let (lifecycle, id) = setup().await;
        lifecycle.accept(&id).await.unwrap();
        lifecycle.mark_ready(&id).await.unwrap();
        assert_invalid(
            lifecycle.reject(&id).await,
            OrderStatus::Ready,
            OrderStatus::Cancelled,
        );
    }

    #[tokio::test]
    async fn complete_requires_ready() {
        let (lifecycle, id) = setup().await;
        assert_invalid(
            lifecycle.complete(&id).await,
            OrderStatus::Pending,
            OrderStatus::Completed,
        );
    }

    #[tokio::test]
    async fn terminal_orders_reject_every_transition() {
        let (lifecycle, id) = setup().await;
        lifecycle.reject(&id).await.unwrap();

        for target in OrderStatus::ALL {
            if target == OrderStatus::Cancelled {
                continue;
            }
            assert_invalid(
                lifecycle.transition(&id, target).await,
                OrderStatus::Cancelled,
                target,
            );
        }
    }

    #[tokio::test]
    async fn transition_to_current_status_is_a_no_op() {
        let (lifecycle, id) = setup().await;
        let before = lifecycle.store().get_by_id(&id).await.unwrap().unwrap();

        let after = lifecycle.transition(&id, OrderStatus::Pending).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn transition_cannot_skip_states() {
        let (lifecycle, id) = setup().await;
        assert_invalid(
            lifecycle.transition(&id, OrderStatus::Ready).await,
            OrderStatus::Pending,
            OrderStatus::Ready,
        );
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let (lifecycle, _) = setup().await;
        let missing = OrderId::new("ORD-9999");
        assert!(matches!(
            lifecycle.accept(&missing).await,
            Err(DomainError::NotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn payment_is_recorded_once() {
        let (lifecycle, id) = setup().await;

        let paid = lifecycle.record_payment(&id).await.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.status, OrderStatus::Pending);

        assert!(matches!(
            lifecycle.record_payment(&id).await,
            Err(DomainError::PaymentNotAllowed { .. })
        ));
    }

    #[tokio::test]
    async fn rejecting_a_paid_order_refunds_it() {
        let (lifecycle, id) = setup().await;
        lifecycle.record_payment(&id).await.unwrap();

        let cancelled = lifecycle.reject(&id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn cancelled_orders_cannot_be_paid() {
        let (lifecycle, id) = setup().await;
        lifecycle.reject(&id).await.unwrap();

        assert!(matches!(
            lifecycle.record_payment(&id).await,
            Err(DomainError::PaymentNotAllowed {
                reason: "order is cancelled",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn edit_with_illegal_status_writes_nothing() {
        let (lifecycle, id) = setup().await;
        let before = lifecycle.store().get_by_id(&id).await.unwrap().unwrap();

        let changes = OrderChanges {
            pickup_time: Some(Some("1:00 PM".to_string())),
            ..OrderChanges::status(OrderStatus::Completed)
        };
        assert_invalid(
            lifecycle.edit(&id, changes).await,
            OrderStatus::Pending,
            OrderStatus::Completed,
        );

        let after = lifecycle.store().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn edit_applies_fields_and_status_together() {
        let (lifecycle, id) = setup().await;
        lifecycle.record_payment(&id).await.unwrap();

        let changes = OrderChanges {
            student_name: Some(Some("Lea".to_string())),
            ..OrderChanges::status(OrderStatus::Cancelled)
        };
        let order = lifecycle.edit(&id, changes).await.unwrap();
        assert_eq!(order.student_name.as_deref(), Some("Lea"));
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn edit_payment_follows_payment_rules() {
        let (lifecycle, id) = setup().await;
        let refund = OrderChanges {
            payment_status: Some(PaymentStatus::Refunded),
            ..OrderChanges::default()
        };
        assert!(matches!(
            lifecycle.edit(&id, refund).await,
            Err(DomainError::PaymentNotAllowed { .. })
        ));

        let pay = OrderChanges {
            payment_status: Some(PaymentStatus::Paid),
            ..OrderChanges::default()
        };
        let paid = lifecycle.edit(&id, pay.clone()).await.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        // Same value again is a no-op
        assert_eq!(lifecycle.edit(&id, pay).await.unwrap(), paid);

        let unpay = OrderChanges {
            payment_status: Some(PaymentStatus::Unpaid),
            ..OrderChanges::default()
        };
        assert!(matches!(
            lifecycle.edit(&id, unpay).await,
            Err(DomainError::PaymentNotAllowed { .. })
        ));
    }

    #[tokio::test]
    async fn edit_cannot_pay_a_cancelled_order() {
        let (lifecycle, id) = setup().await;
        lifecycle.reject(&id).await.unwrap();

        let pay = OrderChanges {
            payment_status: Some(PaymentStatus::Paid),
            ..OrderChanges::default()
        };
        assert!(matches!(
            lifecycle.edit(&id, pay).await,
            Err(DomainError::PaymentNotAllowed {
                reason: "order is cancelled",
                ..
            })
        ));
        let order = lifecycle.store().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn edit_cannot_pay_while_cancelling() {
        let (lifecycle, id) = setup().await;
        let changes = OrderChanges {
            payment_status: Some(PaymentStatus::Paid),
            ..OrderChanges::status(OrderStatus::Cancelled)
        };
        assert!(matches!(
            lifecycle.edit(&id, changes).await,
            Err(DomainError::PaymentNotAllowed { .. })
        ));
        let order = lifecycle.store().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
