//! Merchant Aggregate

use serde::{Deserialize, Serialize};

use super::account::{require, AccountError, Ledger};
use super::meta::{AggregateMeta, MerchantId};
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MerchantStatus { #[default] Active, Inactive, Suspended }

impl MerchantStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "ACTIVE", Self::Inactive => "INACTIVE", Self::Suspended => "SUSPENDED" }
    }
}

impl std::str::FromStr for MerchantStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "SUSPENDED" => Ok(Self::Suspended),
            other => Err(format!("unknown merchant status {other}")),
        }
    }
}

/// Seller account receiving order revenue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    meta: AggregateMeta<MerchantId>,
    name: String,
    email: String,
    phone: Option<String>,
    balance: Ledger,
    status: MerchantStatus,
}

impl Merchant {
    pub fn create(name: &str, email: &str, phone: Option<&str>, opening_balance: Money) -> Result<Self, AccountError> {
        Ok(Self {
            meta: AggregateMeta::new(MerchantId::new()),
            name: require(name, "merchant name")?,
            email: require(email, "email")?.to_lowercase(),
            phone: phone.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string),
            balance: Ledger::new(opening_balance),
            status: MerchantStatus::Active,
        })
    }

    pub fn restore(
        meta: AggregateMeta<MerchantId>,
        name: String,
        email: String,
        phone: Option<String>,
        balance: Money,
        status: MerchantStatus,
    ) -> Self {
        Self { meta, name, email, phone, balance: Ledger::new(balance), status }
    }

    pub fn id(&self) -> MerchantId { self.meta.id }
    pub fn meta(&self) -> &AggregateMeta<MerchantId> { &self.meta }
    pub fn meta_mut(&mut self) -> &mut AggregateMeta<MerchantId> { &mut self.meta }
    pub fn name(&self) -> &str { &self.name }
    pub fn email(&self) -> &str { &self.email }
    pub fn phone(&self) -> Option<&str> { self.phone.as_deref() }
    pub fn balance(&self) -> &Money { self.balance.balance() }
    pub fn status(&self) -> MerchantStatus { self.status }
    pub fn is_active(&self) -> bool { self.status == MerchantStatus::Active }

    pub fn add_revenue(&mut self, amount: &Money) -> Result<(), AccountError> {
        self.balance.credit(amount, self.is_active())
    }

    /// Refund-style debit.
    pub fn deduct(&mut self, amount: &Money) -> Result<(), AccountError> {
        self.balance.debit(amount, self.is_active())
    }

    pub fn activate(&mut self) { self.status = MerchantStatus::Active; }
    pub fn deactivate(&mut self) { self.status = MerchantStatus::Inactive; }
    pub fn suspend(&mut self) { self.status = MerchantStatus::Suspended; }
}
