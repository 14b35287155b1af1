//! Money as integer centavos
//!
//! All monetary amounts in the system are integer cents (centavos). Arithmetic
//! is checked; there is no floating-point representation anywhere on the money
//! path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use thiserror::Error;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount in integer centavos (BRL)
///
/// The inner value is the amount in cents, so `Money::from_cents(18000)`
/// is R$ 180,00. Negative amounts are representable (bank debits), but the
/// billing domain only ever persists non-negative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a Money value from an amount in cents
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a zero amount
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self {
            cents: self.cents.abs(),
        }
    }

    /// Checked addition
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.cents
            .checked_add(other.cents)
            .map(Money::from_cents)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.cents
            .checked_sub(other.cents)
            .map(Money::from_cents)
            .ok_or(MoneyError::Overflow)
    }

    /// Multiplies by an integer count (e.g., sessions in a month)
    pub fn checked_mul(&self, count: i64) -> Result<Money, MoneyError> {
        self.cents
            .checked_mul(count)
            .map(Money::from_cents)
            .ok_or(MoneyError::Overflow)
    }

    /// Absolute difference between two amounts in cents
    pub fn abs_diff(&self, other: &Money) -> i64 {
        (self.cents - other.cents).abs()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        let reais = abs / 100;
        let centavos = abs % 100;

        // Group the integer part with '.' thousands separators
        let digits = reais.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, centavos)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.checked_add(&other).expect("Overflow in Money::add")
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.checked_sub(&other).expect("Overflow in Money::sub")
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self { cents: -self.cents }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
