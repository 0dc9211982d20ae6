use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

/// A signed currency amount rounded to two decimal places. Negative values
/// are outflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

/// Largest magnitude, in whole currency units, a snapshot may carry. Keeps
/// every cent sum the matchers build well inside `i64`.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000_000;

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Whole cents, saturating at the `i64` range.
    pub fn to_cents(self) -> i64 {
        let saturated = if self.0.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        };
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.round().to_i64())
            .unwrap_or(saturated)
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_outflow(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn is_within_limit(self) -> bool {
        self.0.abs() <= Decimal::from(MAX_AMOUNT_UNITS)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cents_round_trip_negative() {
        let m = Money::from_cents(-4530);
        assert_eq!(m.to_cents(), -4530);
        assert_eq!(m.to_string(), "-45.30");
    }

    #[test]
    fn from_decimal_rounds_to_cents() {
        let m = Money::from_decimal(Decimal::from_str("10.256").unwrap());
        assert_eq!(m.to_cents(), 1026);
    }

    #[test]
    fn outflow_and_abs() {
        assert!(Money::from_cents(-1).is_outflow());
        assert!(!Money::from_cents(1).is_outflow());
        assert!(!Money::zero().is_outflow());
        assert_eq!(Money::from_cents(-2000).abs(), Money::from_cents(2000));
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [2000, 1500, 1025].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.to_cents(), 4525);
    }

    #[test]
    fn to_cents_saturates() {
        let huge = Money::from_decimal(Decimal::MAX);
        assert_eq!(huge.to_cents(), i64::MAX);
        assert_eq!((-huge).to_cents(), i64::MIN);
    }
}
