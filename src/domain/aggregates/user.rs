//! User Aggregate

use serde::{Deserialize, Serialize};

use super::account::{require, AccountError, Ledger};
use super::meta::{AggregateMeta, UserId};
use crate::domain::value_objects::{Currency, Money, MoneyError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus { #[default] Active, Inactive }

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "ACTIVE", Self::Inactive => "INACTIVE" }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            other => Err(format!("unknown user status {other}")),
        }
    }
}

/// Buyer with a prepaid balance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    meta: AggregateMeta<UserId>,
    username: String,
    email: String,
    balance: Ledger,
    status: UserStatus,
}

impl User {
    pub fn create(username: &str, email: &str, currency: Currency) -> Result<Self, AccountError> {
        Ok(Self {
            meta: AggregateMeta::new(UserId::new()),
            username: require(username, "username")?,
            email: require(email, "email")?.to_lowercase(),
            balance: Ledger::new(Money::zero(currency)),
            status: UserStatus::Active,
        })
    }

    pub fn restore(meta: AggregateMeta<UserId>, username: String, email: String, balance: Money, status: UserStatus) -> Self {
        Self { meta, username, email, balance: Ledger::new(balance), status }
    }

    pub fn id(&self) -> UserId { self.meta.id }
    pub fn meta(&self) -> &AggregateMeta<UserId> { &self.meta }
    pub fn meta_mut(&mut self) -> &mut AggregateMeta<UserId> { &mut self.meta }
    pub fn username(&self) -> &str { &self.username }
    pub fn email(&self) -> &str { &self.email }
    pub fn balance(&self) -> &Money { self.balance.balance() }
    pub fn status(&self) -> UserStatus { self.status }
    pub fn is_active(&self) -> bool { self.status == UserStatus::Active }

    pub fn recharge(&mut self, amount: &Money) -> Result<(), AccountError> {
        self.balance.credit(amount, self.is_active())
    }

    pub fn deduct(&mut self, amount: &Money) -> Result<(), AccountError> {
        self.balance.debit(amount, self.is_active())
    }

    pub fn has_enough_balance(&self, amount: &Money) -> Result<bool, MoneyError> {
        self.balance.covers(amount)
    }

    pub fn activate(&mut self) { self.status = UserStatus::Active; }
    pub fn deactivate(&mut self) { self.status = UserStatus::Inactive; }
}
