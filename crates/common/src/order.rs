//! The order record and its write-side shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Money, OrderId, OrderStatus, PaymentStatus};

/// Payment method assumed when the client does not name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "G-Cash";

/// A line in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Menu item name.
    pub name: String,

    /// Quantity ordered, at least 1.
    pub quantity: u32,

    /// Price per unit.
    pub price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(name: impl Into<String>, quantity: u32, price: Money) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
        }
    }

    /// Returns the price for this line (quantity * price).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Sums the line totals of `items`.
pub fn items_total(items: &[OrderItem]) -> Money {
    items.iter().map(OrderItem::line_total).sum()
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub student_name: Option<String>,
    pub student_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_method: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub pickup_time: Option<String>,
    pub order_time: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Shallow-merges `changes` over this order.
    ///
    /// `items` is replaced wholesale. The id is never touched. `updated_at`
    /// is set to `now`.
    pub fn merge(&mut self, changes: OrderChanges, now: DateTime<Utc>) {
        let OrderChanges {
            student_name,
            student_id,
            items,
            total,
            status,
            payment_method,
            payment_status,
            pickup_time,
        } = changes;

        if let Some(student_name) = student_name {
            self.student_name = student_name;
        }
        if let Some(student_id) = student_id {
            self.student_id = student_id;
        }
        if let Some(items) = items {
            self.items = items;
        }
        if let Some(total) = total {
            self.total = total;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(payment_method) = payment_method {
            self.payment_method = payment_method;
        }
        if let Some(payment_status) = payment_status {
            self.payment_status = payment_status;
        }
        if let Some(pickup_time) = pickup_time {
            self.pickup_time = pickup_time;
        }
        self.updated_at = now;
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A validated order that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub student_name: Option<String>,
    pub student_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub total: Money,
    /// `None` means the store defaults to `Pending`.
    pub status: Option<OrderStatus>,
    pub payment_method: String,
    pub payment_status: Option<PaymentStatus>,
    pub pickup_time: Option<String>,
}

impl NewOrder {
    /// Creates a new order for the given items with the total derived from them.
    pub fn from_items(items: Vec<OrderItem>) -> Self {
        Self {
            student_name: None,
            student_id: None,
            total: items_total(&items),
            items,
            status: None,
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            payment_status: None,
            pickup_time: None,
        }
    }

    /// Sets the student the order is for.
    pub fn for_student(mut self, name: impl Into<String>, student_id: impl Into<String>) -> Self {
        self.student_name = Some(name.into());
        self.student_id = Some(student_id.into());
        self
    }

    /// Sets the payment method.
    pub fn paid_with(mut self, method: impl Into<String>) -> Self {
        self.payment_method = method.into();
        self
    }

    /// Materializes the record a store persists under `id`.
    pub fn into_order(self, id: OrderId, now: DateTime<Utc>) -> Order {
        Order {
            id,
            student_name: self.student_name,
            student_id: self.student_id,
            items: self.items,
            total: self.total,
            status: self.status.unwrap_or_default(),
            payment_method: self.payment_method,
            payment_status: self.payment_status.unwrap_or_default(),
            pickup_time: self.pickup_time,
            order_time: now,
            updated_at: now,
        }
    }
}

/// Fields of a partial update. `None` leaves the stored value unchanged.
///
/// Nullable fields use a nested `Option`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderChanges {
    pub student_name: Option<Option<String>>,
    pub student_id: Option<Option<String>>,
    pub items: Option<Vec<OrderItem>>,
    pub total: Option<Money>,
    pub status: Option<OrderStatus>,
    pub payment_method: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub pickup_time: Option<Option<String>>,
}

impl OrderChanges {
    /// Changes that only set the status.
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns true if any field other than status or payment status is set.
    pub fn touches_details(&self) -> bool {
        let Self {
            student_name,
            student_id,
            items,
            total,
            status: _,
            payment_method,
            payment_status: _,
            pickup_time,
        } = self;
        student_name.is_some()
            || student_id.is_some()
            || items.is_some()
            || total.is_some()
            || payment_method.is_some()
            || pickup_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        NewOrder::from_items(vec![
            OrderItem::new("Chicken Adobo", 1, Money::from_cents(8500)),
            OrderItem::new("Rice", 2, Money::from_cents(1500)),
        ])
        .for_student("Juan Dela Cruz", "2021-00123")
        .into_order(OrderId::from_sequence(1), Utc::now())
    }

    #[test]
    fn new_order_defaults() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.payment_method, DEFAULT_PAYMENT_METHOD);
        assert_eq!(order.total.cents(), 11500);
        assert_eq!(order.order_time, order.updated_at);
    }

    #[test]
    fn merge_replaces_items_wholesale() {
        let mut order = sample_order();
        let changes = OrderChanges {
            items: Some(vec![OrderItem::new("Sinigang", 1, Money::from_cents(9000))]),
            ..OrderChanges::default()
        };
        order.merge(changes, Utc::now());

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].name, "Sinigang");
        assert_eq!(order.student_name.as_deref(), Some("Juan Dela Cruz"));
    }

    #[test]
    fn merge_can_clear_nullable_fields() {
        let mut order = sample_order();
        order.pickup_time = Some("12:30 PM".to_string());
        let changes = OrderChanges {
            pickup_time: Some(None),
            student_name: Some(Some("Maria Clara".to_string())),
            ..OrderChanges::default()
        };
        order.merge(changes, Utc::now());

        assert_eq!(order.pickup_time, None);
        assert_eq!(order.student_name.as_deref(), Some("Maria Clara"));
        assert_eq!(order.id, OrderId::from_sequence(1));
    }

    #[test]
    fn empty_changes_leave_fields_alone() {
        let mut order = sample_order();
        let before = order.clone();
        let later = before.updated_at + chrono::Duration::seconds(5);
        order.merge(OrderChanges::default(), later);

        assert_eq!(order.items, before.items);
        assert_eq!(order.status, before.status);
        assert_eq!(order.updated_at, later);
    }

    #[test]
    fn touches_details_ignores_status_fields() {
        assert!(!OrderChanges::status(OrderStatus::Ready).touches_details());
        let changes = OrderChanges {
            payment_status: Some(PaymentStatus::Paid),
            ..OrderChanges::default()
        };
        assert!(!changes.touches_details());
        let changes = OrderChanges {
            pickup_time: Some(None),
            ..OrderChanges::default()
        };
        assert!(changes.touches_details());
    }

    #[test]
    fn order_serializes_camel_case() {
        let json = serde_json::to_value(sample_order()).unwrap();
        assert_eq!(json["id"], "ORD-0001");
        assert_eq!(json["studentName"], "Juan Dela Cruz");
        assert_eq!(json["paymentMethod"], "G-Cash");
        assert_eq!(json["paymentStatus"], "Unpaid");
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["total"], 115);
        assert_eq!(json["items"][1]["price"], 15);
        assert!(json["orderTime"].is_string());
    }
}
