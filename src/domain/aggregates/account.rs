//! Balance ledger shared by buyer and merchant accounts

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::{Money, MoneyError};
use crate::ErrorKind;

/// Money balance with symmetric credit/debit guards.
///
/// Both operations reject zero amounts and inactive accounts; debit also
/// requires `balance >= amount`. Callers pass their own lifecycle check in
/// as `active`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Ledger(Money);

impl Ledger {
    pub(crate) fn new(opening: Money) -> Self { Self(opening) }
    pub(crate) fn balance(&self) -> &Money { &self.0 }

    pub(crate) fn credit(&mut self, amount: &Money, active: bool) -> Result<(), AccountError> {
        Self::guard(amount, active)?;
        self.0 = self.0.add(amount)?;
        Ok(())
    }

    pub(crate) fn debit(&mut self, amount: &Money, active: bool) -> Result<(), AccountError> {
        Self::guard(amount, active)?;
        if self.0.is_less_than(amount)? {
            return Err(AccountError::InsufficientBalance { available: self.0.clone(), requested: amount.clone() });
        }
        self.0 = self.0.subtract(amount)?;
        Ok(())
    }

    pub(crate) fn covers(&self, amount: &Money) -> Result<bool, MoneyError> {
        self.0.is_greater_than_or_equal(amount)
    }

    fn guard(amount: &Money, active: bool) -> Result<(), AccountError> {
        if amount.is_zero() { return Err(AccountError::ZeroAmount); }
        if !active { return Err(AccountError::Inactive); }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccountError {
    #[error("{0} cannot be empty")]
    MissingField(&'static str),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("account is not active")]
    Inactive,
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Money, requested: Money },
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) | Self::ZeroAmount => ErrorKind::Validation,
            Self::Inactive | Self::InsufficientBalance { .. } => ErrorKind::StateConflict,
            Self::Money(e) => e.kind(),
        }
    }
}

pub(crate) fn require(value: &str, field: &'static str) -> Result<String, AccountError> {
    let value = value.trim();
    if value.is_empty() { return Err(AccountError::MissingField(field)); }
    Ok(value.to_string())
}
