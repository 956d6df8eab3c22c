//! Ruble amounts using decimal arithmetic.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// Arithmetic overflowed the decimal range.
    #[error("amount overflow")]
    Overflow,
}

/// A non-negative amount in rubles, kept at two decimal places.
///
/// The shop sells in a single currency (RUB), so the currency is implied.
/// Serializes as a decimal string to keep JSON clients from rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// ISO 4217 code of the shop currency.
    pub const CURRENCY: &'static str = "RUB";

    /// Zero rubles.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount, rounding half-away-from-zero to kopecks.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for negative amounts.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        Ok(Self(
            amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        ))
    }

    /// Whole rubles, convenient in tests and seeds.
    #[must_use]
    pub fn rubles(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a line quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the product does not fit.
    pub fn times(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the sum does not fit.
    pub fn plus(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Fixed two-decimal rendering used by payment gateways and feeds
    /// (`"1490.00"`).
    #[must_use]
    pub fn to_fixed(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ₽", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_rounds_to_kopecks() {
        let m = Money::new(Decimal::from_str("10.005").unwrap()).unwrap();
        assert_eq!(m.to_fixed(), "10.01");
    }

    #[test]
    fn test_rejects_negative() {
        assert_eq!(
            Money::new(Decimal::from_str("-1").unwrap()),
            Err(MoneyError::Negative)
        );
    }

    #[test]
    fn test_line_total() {
        let price = Money::new(Decimal::from_str("199.90").unwrap()).unwrap();
        let total = price.times(3).unwrap().plus(Money::rubles(1)).unwrap();
        assert_eq!(total.to_fixed(), "600.70");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::rubles(1490)).unwrap();
        assert_eq!(json, "\"1490\"");
    }
}
