use serde::{Deserialize, Serialize};

/// Prefix of store-assigned order codes.
const ORDER_CODE_PREFIX: &str = "ORD-";

/// Unique identifier for an order.
///
/// Store-assigned ids are human-readable codes built from a zero-padded
/// sequence number (`ORD-0001`). Imported orders may carry any non-empty
/// string, so the wrapper does not enforce the code format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the code for the given sequence number.
    pub fn from_sequence(sequence: i64) -> Self {
        Self(format!("{ORDER_CODE_PREFIX}{sequence:04}"))
    }

    /// Returns the sequence number if this id is a store-assigned code.
    pub fn sequence(&self) -> Option<i64> {
        self.0
            .strip_prefix(ORDER_CODE_PREFIX)
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
