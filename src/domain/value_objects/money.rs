//! Money value object
//!
//! Amounts are non-negative decimals fixed at two fractional digits, rounded
//! half-up at construction. Every binary operation is currency-checked.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::ErrorKind;

const SCALE: u32 = 2;

/// Largest storable amount, `99999999999999999.99` (NUMERIC(19,2)).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, SCALE);

/// ISO-style currency code, trimmed and upper-cased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Result<Self, MoneyError> {
        let code = code.as_ref().trim().to_uppercase();
        if code.is_empty() { return Err(MoneyError::BlankCurrency); }
        Ok(Self(code))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for Currency {
    type Error = MoneyError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self { currency.0 }
}

/// Immutable monetary amount bound to a currency.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyRepr", into = "MoneyRepr")]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

#[derive(Serialize, Deserialize)]
struct MoneyRepr {
    #[serde(with = "rust_decimal::serde::str")]
    amount: Decimal,
    currency: String,
}

impl TryFrom<MoneyRepr> for Money {
    type Error = MoneyError;
    fn try_from(repr: MoneyRepr) -> Result<Self, Self::Error> { Money::of(repr.amount, &repr.currency) }
}

impl From<Money> for MoneyRepr {
    fn from(money: Money) -> Self { Self { amount: money.amount, currency: money.currency.0 } }
}

impl Money {
    /// Build a normalized amount. Negative amounts are rejected before rounding.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        let amount = within_range(amount).ok_or(MoneyError::TooLarge(amount))?;
        Ok(Self { amount, currency })
    }

    pub fn of(amount: Decimal, currency: &str) -> Result<Self, MoneyError> {
        Self::new(amount, Currency::new(currency)?)
    }

    pub fn zero(currency: Currency) -> Self {
        Self { amount: normalize(Decimal::ZERO), currency }
    }

    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &Currency { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }
    pub fn is_positive(&self) -> bool { self.amount > Decimal::ZERO }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.check_currency(other)?;
        self.arithmetic(self.amount.checked_add(other.amount))
    }

    /// Fails instead of going negative; this type cannot represent debt.
    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        self.check_currency(other)?;
        let result = self.amount - other.amount;
        if result < Decimal::ZERO {
            return Err(MoneyError::NegativeResult { minuend: self.clone(), subtrahend: other.clone() });
        }
        Money::new(result, self.currency.clone())
    }

    pub fn multiply(&self, quantity: u32) -> Result<Money, MoneyError> {
        self.arithmetic(self.amount.checked_mul(Decimal::from(quantity)))
    }

    pub fn multiply_by(&self, factor: Decimal) -> Result<Money, MoneyError> {
        if factor < Decimal::ZERO { return Err(MoneyError::NegativeFactor(factor)); }
        self.arithmetic(self.amount.checked_mul(factor))
    }

    pub fn compare(&self, other: &Money) -> Result<Ordering, MoneyError> {
        self.check_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    pub fn is_greater_than(&self, other: &Money) -> Result<bool, MoneyError> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn is_greater_than_or_equal(&self, other: &Money) -> Result<bool, MoneyError> {
        Ok(self.compare(other)? != Ordering::Less)
    }

    pub fn is_less_than(&self, other: &Money) -> Result<bool, MoneyError> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    pub fn is_less_than_or_equal(&self, other: &Money) -> Result<bool, MoneyError> {
        Ok(self.compare(other)? != Ordering::Greater)
    }

    /// Result of `add`/`multiply`; `None` means the decimal itself overflowed.
    fn arithmetic(&self, result: Option<Decimal>) -> Result<Money, MoneyError> {
        let amount = result.and_then(within_range).ok_or(MoneyError::Overflow)?;
        Ok(Self { amount, currency: self.currency.clone() })
    }

    fn check_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

/// Normalized amount, or `None` when it is above [`MAX_AMOUNT`] before or after rounding.
fn within_range(amount: Decimal) -> Option<Decimal> {
    if amount > MAX_AMOUNT { return None; }
    Some(normalize(amount)).filter(|rounded| *rounded <= MAX_AMOUNT)
}

fn normalize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    rounded
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoneyError {
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    #[error("amount {0} exceeds 99999999999999999.99")]
    TooLarge(Decimal),
    #[error("result exceeds the largest amount 99999999999999999.99")]
    Overflow,
    #[error("currency cannot be blank")]
    BlankCurrency,
    #[error("multiplier cannot be negative: {0}")]
    NegativeFactor(Decimal),
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },
    #[error("cannot subtract {subtrahend} from {minuend}")]
    NegativeResult { minuend: Money, subtrahend: Money },
}

impl MoneyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Negative(_) | Self::TooLarge(_) | Self::BlankCurrency | Self::NegativeFactor(_) => ErrorKind::Validation,
            Self::CurrencyMismatch { .. } | Self::NegativeResult { .. } | Self::Overflow => ErrorKind::StateConflict,
        }
    }
}
