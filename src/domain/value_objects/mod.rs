//! Value Objects for order processing

mod money;

pub use money::{Currency, Money, MoneyError, MAX_AMOUNT};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ErrorKind;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > 50 { return Err(SkuError::TooLong(value.len())); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuError {
    #[error("SKU cannot be empty")]
    Empty,
    #[error("SKU too long ({0} > 50 characters)")]
    TooLong(usize),
}

impl SkuError {
    pub fn kind(&self) -> ErrorKind { ErrorKind::Validation }
}

/// Non-negative stock count, at most [`Quantity::MAX`] (a Postgres INTEGER).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const MAX: u32 = i32::MAX as u32;

    pub fn new(value: u32) -> Self { Self(value) }
    /// `None` above [`Quantity::MAX`].
    pub fn bounded(value: u32) -> Option<Self> { (value <= Self::MAX).then_some(Self(value)) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn checked_add(&self, other: u32) -> Option<Self> { self.0.checked_add(other).and_then(Self::bounded) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn covers(&self, requested: u32) -> bool { self.0 >= requested }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
