//! Type-safe price representation using decimal arithmetic.
//!
//! Prices travel over the wire as plain JSON numbers (`299`, `129.5`) and are
//! stored as `NUMERIC`, so arithmetic never goes through binary floats.

use core::iter::Sum;
use core::num::NonZeroU32;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize, Serializer};

/// A non-currency-tagged shop price.
///
/// The shop prices everything in a single currency, so only the amount is kept.
/// Whole amounts serialize as JSON integers, anything else as a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(deserialize_with = "rust_decimal::serde::float::deserialize")] Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole amount.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Get the underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the price is below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract().is_zero()
            && let Some(units) = self.0.to_i64()
        {
            return serializer.serialize_i64(units);
        }
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<NonZeroU32> for Price {
    type Output = Self;

    fn mul(self, quantity: NonZeroU32) -> Self::Output {
        Self(self.0 * Decimal::from(quantity.get()))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        let price = Price::from_units(299);
        assert_eq!(serde_json::to_string(&price).unwrap(), "299");

        let price = Price::new(Decimal::new(1295, 1));
        assert_eq!(serde_json::to_string(&price).unwrap(), "129.5");
    }

    #[test]
    fn test_deserializes_integers_and_fractions() {
        let whole: Price = serde_json::from_str("129").unwrap();
        assert_eq!(whole, Price::from_units(129));

        let fraction: Price = serde_json::from_str("19.99").unwrap();
        assert_eq!(fraction.amount(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_multiply_by_quantity() {
        let quantity = NonZeroU32::new(3).unwrap();
        assert_eq!(Price::from_units(150) * quantity, Price::from_units(450));
    }

    #[test]
    fn test_negative_detection() {
        assert!(Price::from_units(-1).is_negative());
        assert!(!Price::ZERO.is_negative());
    }
}
