//! Monetary amounts.
//!
//! All prices, costs and totals are stored as `NUMERIC` and handled as
//! [`Decimal`]. [`Money`] is the one place where they are converted for JSON:
//! it serializes as a plain number and accepts either a number or a numeric
//! string when deserializing, so no handler converts decimals by hand.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Sub};

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Amounts must stay below this to fit a `NUMERIC(12, 2)` column.
const STORAGE_LIMIT: i64 = 10_000_000_000;

/// A monetary amount in the shop's currency (Thai baht, two decimal places).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    /// Zero baht.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build an amount from satang (hundredths).
    #[must_use]
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Amount rounded to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self(self.0.round_dp(2))
    }

    /// Whether the amount, rounded to two places, fits a `NUMERIC(12, 2)`
    /// column.
    #[must_use]
    pub fn fits_storage(&self) -> bool {
        self.rounded().0.abs() < Decimal::from(STORAGE_LIMIT)
    }

    /// Multiply by a quantity of units.
    #[must_use]
    pub fn times(&self, quantity: i64) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Convert to `f64` for serialization.
    ///
    /// Amounts in this domain are far inside `f64`'s exact range for two
    /// decimal places; values that cannot be represented fall back to zero.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.0.round_dp(2).to_f64().unwrap_or_default()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        self.times(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Decimal::from_f64(v)
            .map(|d| Money(d.round_dp(2)))
            .ok_or_else(|| E::custom(format!("amount out of range: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.trim()
            .parse::<Decimal>()
            .map(Money)
            .map_err(|e| E::custom(format!("invalid amount '{v}': {e}")))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        assert_eq!(Money::from_minor(12_950).to_string(), "129.50");
        assert_eq!(Money::from_minor(-250).to_string(), "-2.50");
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Money::from_minor(12_950)).unwrap();
        assert_eq!(json, "129.5");
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let a: Money = serde_json::from_str("120").unwrap();
        let b: Money = serde_json::from_str("\"120.00\"").unwrap();
        let c: Money = serde_json::from_str("120.0").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_rejects_non_numeric_string() {
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
    }

    #[test]
    fn test_fits_storage() {
        assert!(Money::from_minor(999_999_999_999).fits_storage());
        assert!(Money::from_minor(-999_999_999_999).fits_storage());
        assert!(!Money::from_minor(1_000_000_000_000).fits_storage());
        assert!(!Money::new(Decimal::new(9_999_999_999_995, 3)).fits_storage());
    }

    #[test]
    fn test_arithmetic() {
        let price = Money::from_minor(4_500);
        assert_eq!(price * 3, Money::from_minor(13_500));
        assert_eq!(price + price - price, price);
        let total: Money = [price, price].iter().sum();
        assert_eq!(total, Money::from_minor(9_000));
    }

    #[test]
    fn test_is_negative() {
        assert!(Money::from_minor(-1).is_negative());
        assert!(!Money::ZERO.is_negative());
    }
}
