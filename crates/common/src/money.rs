//! Money amounts held in cents.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Money amount represented in cents to avoid floating point drift.
///
/// On the wire amounts are plain JSON numbers in major units (`85`,
/// `42.5`), which is what cafeteria clients send and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts a major-unit amount, rounding to the nearest cent.
    ///
    /// Returns `None` for non-finite or out-of-range values.
    pub fn from_major(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents < i64::MIN as f64 || cents > i64::MAX as f64 {
            return None;
        }
        Some(Self {
            cents: cents as i64,
        })
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount in major units.
    pub fn as_major(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Multiplies by a quantity, saturating on overflow.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.cents % 100 == 0 {
            serializer.serialize_i64(self.cents / 100)
        } else {
            serializer.serialize_f64(self.as_major())
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Money::from_major(amount)
            .ok_or_else(|| serde::de::Error::custom(format!("amount out of range: {amount}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_major_rounds_to_nearest_cent() {
        assert_eq!(Money::from_major(85.0).unwrap().cents(), 8500);
        assert_eq!(Money::from_major(42.5).unwrap().cents(), 4250);
        assert_eq!(Money::from_major(0.126).unwrap().cents(), 13);
        assert_eq!(Money::from_major(19.99).unwrap().cents(), 1999);
    }

    #[test]
    fn from_major_rejects_non_finite() {
        assert!(Money::from_major(f64::NAN).is_none());
        assert!(Money::from_major(f64::INFINITY).is_none());
        assert!(Money::from_major(1e30).is_none());
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_cents(8500).to_string(), "85.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn whole_amounts_serialize_as_integers() {
        let json = serde_json::to_value(Money::from_cents(8500)).unwrap();
        assert_eq!(json, serde_json::json!(85));

        let json = serde_json::to_value(Money::from_cents(4250)).unwrap();
        assert_eq!(json, serde_json::json!(42.5));
    }

    #[test]
    fn deserializes_integers_and_floats() {
        let m: Money = serde_json::from_str("85").unwrap();
        assert_eq!(m.cents(), 8500);
        let m: Money = serde_json::from_str("12.75").unwrap();
        assert_eq!(m.cents(), 1275);
    }

    #[test]
    fn sum_and_multiply() {
        let total: Money = [Money::from_cents(8500).multiply(2), Money::from_cents(1500)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 18500);
    }
}
