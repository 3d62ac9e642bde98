//! Currency amounts.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency used when none is given.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Errors raised by money construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoneyError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(f64),

    #[error("Amount must be a finite number")]
    NonFiniteAmount,

    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("Currency mismatch: cannot combine {left} with {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("Cannot subtract {subtrahend} from {minuend}: result would be negative")]
    NegativeResult { minuend: Money, subtrahend: Money },

    #[error("Multiplication factor must be finite and non-negative: {0}")]
    InvalidFactor(f64),

    #[error("Amount is out of range")]
    Overflow,
}

/// A non-negative amount of money in a single currency.
///
/// Stored in cents so that two-decimal rounding happens exactly once, at
/// construction. There is no debt representation: every operation that
/// would go below zero fails instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyRepr")]
pub struct Money {
    cents: i64,
    currency: String,
}

#[derive(Deserialize)]
struct MoneyRepr {
    cents: i64,
    currency: String,
}

impl TryFrom<MoneyRepr> for Money {
    type Error = MoneyError;

    fn try_from(repr: MoneyRepr) -> Result<Self, Self::Error> {
        Money::from_cents(repr.cents, &repr.currency)
    }
}

impl Money {
    /// Creates an amount in the default currency, rounded to 2 decimals.
    pub fn new(amount: f64) -> Result<Self, MoneyError> {
        Self::with_currency(amount, DEFAULT_CURRENCY)
    }

    /// Creates an amount in the given currency, rounded to 2 decimals.
    pub fn with_currency(amount: f64, currency: &str) -> Result<Self, MoneyError> {
        if !amount.is_finite() {
            return Err(MoneyError::NonFiniteAmount);
        }
        if amount < 0.0 {
            return Err(MoneyError::NegativeAmount(amount));
        }
        let cents = round_to_cents(amount)?;
        Self::from_cents(cents, currency)
    }

    /// Creates an amount from whole cents.
    pub fn from_cents(cents: i64, currency: &str) -> Result<Self, MoneyError> {
        if cents < 0 {
            return Err(MoneyError::NegativeAmount(cents as f64 / 100.0));
        }
        Ok(Self {
            cents,
            currency: normalize_currency(currency)?,
        })
    }

    /// Returns zero in the given currency.
    pub fn zero(currency: &str) -> Result<Self, MoneyError> {
        Self::from_cents(0, currency)
    }

    /// Returns the amount in major units (e.g. dollars).
    pub fn amount(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let cents = self
            .cents
            .checked_add(other.cents)
            .ok_or(MoneyError::Overflow)?;
        Ok(self.with_cents(cents))
    }

    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        if other.cents > self.cents {
            return Err(MoneyError::NegativeResult {
                minuend: self.clone(),
                subtrahend: other.clone(),
            });
        }
        Ok(self.with_cents(self.cents - other.cents))
    }

    /// Scales by a dimensionless factor (e.g. an offer percentage).
    pub fn multiply(&self, factor: f64) -> Result<Money, MoneyError> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(MoneyError::InvalidFactor(factor));
        }
        let cents = (self.cents as f64 * factor).round();
        if cents >= i64::MAX as f64 {
            return Err(MoneyError::Overflow);
        }
        Ok(self.with_cents(cents as i64))
    }

    pub fn is_greater_than_or_equal(&self, other: &Money) -> Result<bool, MoneyError> {
        Ok(self.compare(other)? != Ordering::Less)
    }

    /// Orders two amounts of the same currency.
    pub fn compare(&self, other: &Money) -> Result<Ordering, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.cents.cmp(&other.cents))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            })
        }
    }

    fn with_cents(&self, cents: i64) -> Money {
        Money {
            cents,
            currency: self.currency.clone(),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = group_thousands(self.cents / 100);
        let fraction = self.cents % 100;
        if self.currency == DEFAULT_CURRENCY {
            write!(f, "${whole}.{fraction:02}")
        } else {
            write!(f, "{whole}.{fraction:02} {}", self.currency)
        }
    }
}

fn round_to_cents(amount: f64) -> Result<i64, MoneyError> {
    let cents = (amount * 100.0).round();
    if cents >= i64::MAX as f64 {
        return Err(MoneyError::Overflow);
    }
    Ok(cents as i64)
}

fn normalize_currency(currency: &str) -> Result<String, MoneyError> {
    let code = currency.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(MoneyError::InvalidCurrency(currency.to_string()));
    }
    Ok(code.to_ascii_uppercase())
}

fn group_thousands(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
