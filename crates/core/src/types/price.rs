//! Type-safe price representation using decimal arithmetic.
//!
//! The backend reports prices as bare numbers in the store currency. Totals
//! are never recomputed client-side; `Price` exists so amounts are carried
//! without float rounding and formatted consistently.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount in the store currency.
///
/// Deserializes from either a JSON number or a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of currency units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_number() {
        let price: Price = serde_json::from_str("149").unwrap();
        assert_eq!(price, Price::from_units(149));
    }

    #[test]
    fn test_deserialize_from_string() {
        let price: Price = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(price.amount(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Price::from_units(149).to_string(), "149.00");
        assert_eq!(Price::new(Decimal::new(1999, 2)).to_string(), "19.99");
    }
}
