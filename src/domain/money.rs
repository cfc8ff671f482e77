use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// Money - two-decimal currency amounts
// ============================================================================
//
// Amounts are held as whole cents. Every value entering the system goes
// through `round_money`, which parses into a `Decimal` and rounds there, so
// "1.005" is 1.01 and never 1.00499... Arithmetic on cents is checked.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Amount out of range: {0}")]
    OutOfRange(String),

    #[error("Amount overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Rounds to the nearest cent, half away from zero.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        value
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Self)
            .ok_or_else(|| MoneyError::OutOfRange(value.to_string()))
    }

    pub fn checked_add(self, rhs: Money) -> Result<Money, MoneyError> {
        self.0.checked_add(rhs.0).map(Money).ok_or(MoneyError::Overflow)
    }

    pub fn checked_mul(self, quantity: i32) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Money)
            .ok_or(MoneyError::Overflow)
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Rounds a JSON number or numeric string to two decimals.
/// Anything else (null, booleans, garbage strings) counts as zero.
/// Numbers too large for the cents column are rejected.
pub fn round_money(value: &Value) -> Result<Money, MoneyError> {
    match value {
        // serde_json prints floats in their shortest form, so 9.99 reads as 9.99.
        Value::Number(n) => {
            let raw = n.to_string();
            parse_decimal(&raw)
                .ok_or(MoneyError::OutOfRange(raw))
                .and_then(Money::from_decimal)
        }
        Value::String(s) => {
            let raw = s.trim();
            match parse_decimal(raw) {
                Some(decimal) => Money::from_decimal(decimal),
                None if raw.parse::<f64>().is_ok_and(f64::is_finite) => {
                    Err(MoneyError::OutOfRange(raw.to_string()))
                }
                None => Ok(Money::ZERO),
            }
        }
        _ => Ok(Money::ZERO),
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        round_money(&value).map_err(de::Error::custom)
    }
}
