//! Validation of untyped order input.
//!
//! Clients send loosely-typed JSON. Everything is checked here, at the edge,
//! and converted into the strictly-typed shapes from `common`. Every
//! violation is collected so a client can fix its payload in one round trip.

use chrono::{DateTime, Utc};
use common::{
    DEFAULT_PAYMENT_METHOD, Money, NewOrder, Order, OrderChanges, OrderId, OrderItem,
    OrderStatus, PaymentStatus, items_total,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Path of the offending field, e.g. `items[0].quantity`.
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Input that cannot become an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid order: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Creates an error with a single violation.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation {
                field: field.into(),
                message: message.into(),
            }],
        }
    }

    /// Returns true if any violation concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

#[derive(Default)]
struct Violations(Vec<Violation>);

impl Violations {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations: self.0 })
        }
    }
}

fn as_object(candidate: &Value) -> Result<&Map<String, Value>, ValidationError> {
    candidate
        .as_object()
        .ok_or_else(|| ValidationError::single("order", "must be a JSON object"))
}

/// Validates a create request and normalizes it into a [`NewOrder`].
///
/// Unknown fields, and fields the store assigns (`id`, `orderTime`), are
/// ignored.
pub fn validate_order(candidate: &Value) -> Result<NewOrder, ValidationError> {
    let obj = as_object(candidate)?;
    let mut violations = Violations::default();

    let items = match obj.get("items") {
        None | Some(Value::Null) => {
            violations.push("items", "is required");
            None
        }
        Some(value) => parse_items(value, &mut violations),
    };

    let total = match obj.get("total") {
        None | Some(Value::Null) => {
            violations.push("total", "is required");
            None
        }
        Some(value) => parse_amount("total", value, &mut violations),
    };

    if let (Some(items), Some(total)) = (&items, total) {
        check_total_matches(total, items, &mut violations);
    }

    let status = optional_status(obj, &mut violations);
    let payment_status = optional_payment_status(obj, &mut violations);
    let payment_method = optional_payment_method(obj, &mut violations);
    let student_name = optional_text(obj, "studentName", &mut violations);
    let student_id = optional_text(obj, "studentId", &mut violations);
    let pickup_time = optional_text(obj, "pickupTime", &mut violations);

    violations.finish()?;

    Ok(NewOrder {
        student_name: student_name.flatten(),
        student_id: student_id.flatten(),
        items: items.unwrap_or_default(),
        total: total.unwrap_or_default(),
        status: status.flatten(),
        payment_method: payment_method
            .flatten()
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        payment_status: payment_status.flatten(),
        pickup_time: pickup_time.flatten(),
    })
}

/// Validates a pre-existing order being migrated in with its own id.
///
/// Same rules as [`validate_order`], plus a required non-empty `id` and an
/// optional RFC 3339 `orderTime` (defaults to now).
pub fn validate_import(candidate: &Value) -> Result<Order, ValidationError> {
    let obj = as_object(candidate)?;
    let mut violations = Violations::default();

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(OrderId::new(s.trim())),
        Some(Value::String(_)) => {
            violations.push("id", "must not be empty");
            None
        }
        None | Some(Value::Null) => {
            violations.push("id", "is required");
            None
        }
        Some(_) => {
            violations.push("id", "must be a string");
            None
        }
    };

    let order_time = match obj.get("orderTime") {
        None | Some(Value::Null) => Some(Utc::now()),
        Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(_) => {
                violations.push("orderTime", "must be an RFC 3339 timestamp");
                None
            }
        },
        Some(_) => {
            violations.push("orderTime", "must be a string");
            None
        }
    };

    let new_order = match validate_order(candidate) {
        Ok(new_order) => Some(new_order),
        Err(err) => {
            violations.0.extend(err.violations);
            None
        }
    };

    violations.finish()?;

    match (new_order, id, order_time) {
        (Some(new_order), Some(id), Some(order_time)) => Ok(new_order.into_order(id, order_time)),
        _ => Err(ValidationError::single("order", "is incomplete")),
    }
}

/// Validates a partial update of the order stored under `current_id`.
///
/// Every field is optional but at least one must be present. `id` may be
/// echoed back but never changed. When `items` is replaced without a
/// `total`, the total is recomputed from the new items.
pub fn validate_changes(
    candidate: &Value,
    current_id: &OrderId,
) -> Result<OrderChanges, ValidationError> {
    let obj = as_object(candidate)?;
    let mut violations = Violations::default();

    if let Some(id) = obj.get("id")
        && id.as_str() != Some(current_id.as_str())
    {
        violations.push("id", "cannot be changed");
    }

    let items = match obj.get("items") {
        None => None,
        Some(Value::Null) => {
            violations.push("items", "cannot be null");
            None
        }
        Some(value) => parse_items(value, &mut violations),
    };

    let total = match obj.get("total") {
        None => None,
        Some(Value::Null) => {
            violations.push("total", "cannot be null");
            None
        }
        Some(value) => parse_amount("total", value, &mut violations),
    };

    let total = match (&items, total) {
        (Some(items), Some(total)) => {
            check_total_matches(total, items, &mut violations);
            Some(total)
        }
        (Some(items), None) => Some(items_total(items)),
        (None, total) => total,
    };

    let changes = OrderChanges {
        student_name: optional_text(obj, "studentName", &mut violations),
        student_id: optional_text(obj, "studentId", &mut violations),
        items,
        total,
        status: optional_status(obj, &mut violations).flatten(),
        payment_method: optional_payment_method(obj, &mut violations)
            .map(|method| method.unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string())),
        payment_status: optional_payment_status(obj, &mut violations).flatten(),
        pickup_time: optional_text(obj, "pickupTime", &mut violations),
    };

    violations.finish()?;

    if changes.is_empty() {
        return Err(ValidationError::single(
            "order",
            "must contain at least one updatable field",
        ));
    }

    Ok(changes)
}

/// Checks a total against the line items.
pub fn check_total(total: Money, items: &[OrderItem]) -> Result<(), ValidationError> {
    let mut violations = Violations::default();
    check_total_matches(total, items, &mut violations);
    violations.finish()
}

fn check_total_matches(total: Money, items: &[OrderItem], violations: &mut Violations) {
    let expected = items_total(items);
    if total != expected {
        violations.push(
            "total",
            format!("does not match the items (expected {expected}, got {total})"),
        );
    }
}

fn parse_items(value: &Value, violations: &mut Violations) -> Option<Vec<OrderItem>> {
    let Some(array) = value.as_array() else {
        violations.push("items", "must be an array");
        return None;
    };
    if array.is_empty() {
        violations.push("items", "must contain at least one item");
        return None;
    }

    let before = violations.0.len();
    let items: Vec<OrderItem> = array
        .iter()
        .enumerate()
        .filter_map(|(index, item)| parse_item(index, item, violations))
        .collect();

    (violations.0.len() == before).then_some(items)
}

fn parse_item(index: usize, value: &Value, violations: &mut Violations) -> Option<OrderItem> {
    let path = format!("items[{index}]");
    let Some(obj) = value.as_object() else {
        violations.push(path, "must be an object");
        return None;
    };

    let name = match obj.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::String(_)) => {
            violations.push(format!("{path}.name"), "must not be empty");
            None
        }
        None | Some(Value::Null) => {
            violations.push(format!("{path}.name"), "is required");
            None
        }
        Some(_) => {
            violations.push(format!("{path}.name"), "must be a string");
            None
        }
    };

    let quantity = match obj.get("quantity") {
        None | Some(Value::Null) => {
            violations.push(format!("{path}.quantity"), "is required");
            None
        }
        Some(Value::Number(n)) => match n.as_i64() {
            Some(q) if q < 1 => {
                violations.push(format!("{path}.quantity"), "must be at least 1");
                None
            }
            Some(q) => match u32::try_from(q) {
                Ok(q) => Some(q),
                Err(_) => {
                    violations.push(format!("{path}.quantity"), "is too large");
                    None
                }
            },
            None if n.is_u64() => {
                violations.push(format!("{path}.quantity"), "is too large");
                None
            }
            None => {
                violations.push(format!("{path}.quantity"), "must be a whole number");
                None
            }
        },
        Some(_) => {
            violations.push(format!("{path}.quantity"), "must be a number");
            None
        }
    };

    let price = match obj.get("price") {
        None | Some(Value::Null) => {
            violations.push(format!("{path}.price"), "is required");
            None
        }
        Some(value) => parse_amount(&format!("{path}.price"), value, violations),
    };

    Some(OrderItem::new(name?, quantity?, price?))
}

fn parse_amount(field: &str, value: &Value, violations: &mut Violations) -> Option<Money> {
    let Some(amount) = value.as_f64() else {
        violations.push(field, "must be a number");
        return None;
    };
    // Checked before rounding so sub-cent negatives cannot round to zero
    if amount < 0.0 {
        violations.push(field, "must not be negative");
        return None;
    }
    match Money::from_major(amount) {
        Some(money) => Some(money),
        None => {
            violations.push(field, "is out of range");
            None
        }
    }
}

/// `None`: absent. `Some(None)`: explicitly null. `Some(Some(_))`: a value.
fn optional_text(
    obj: &Map<String, Value>,
    field: &str,
    violations: &mut Violations,
) -> Option<Option<String>> {
    match obj.get(field)? {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => {
            violations.push(field, "must be a string");
            None
        }
    }
}

fn optional_payment_method(
    obj: &Map<String, Value>,
    violations: &mut Violations,
) -> Option<Option<String>> {
    optional_text(obj, "paymentMethod", violations)
        .map(|method| method.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()))
}

fn optional_status(
    obj: &Map<String, Value>,
    violations: &mut Violations,
) -> Option<Option<OrderStatus>> {
    parse_enum(obj, "status", &OrderStatus::ALL.map(|s| s.as_str()), violations)
}

fn optional_payment_status(
    obj: &Map<String, Value>,
    violations: &mut Violations,
) -> Option<Option<PaymentStatus>> {
    parse_enum(
        obj,
        "paymentStatus",
        &PaymentStatus::ALL.map(|s| s.as_str()),
        violations,
    )
}

fn parse_enum<T: std::str::FromStr>(
    obj: &Map<String, Value>,
    field: &str,
    allowed: &[&str],
    violations: &mut Violations,
) -> Option<Option<T>> {
    match obj.get(field)? {
        Value::Null => Some(None),
        Value::String(s) => match s.parse() {
            Ok(value) => Some(Some(value)),
            Err(_) => {
                violations.push(field, format!("must be one of {}", allowed.join(", ")));
                None
            }
        },
        _ => {
            violations.push(field, "must be a string");
            None
        }
    }
}
