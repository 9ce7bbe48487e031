//! Buyer and merchant account management

use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use super::dto::{CreateMerchantRequest, CreateUserRequest, RechargeRequest};
use crate::domain::aggregates::{Merchant, MerchantId, User, UserId};
use crate::domain::repository::{MerchantRepository, UserRepository};
use crate::domain::value_objects::{Currency, Money};
use crate::{EcommerceError, Result};

/// Administrative lifecycle changes. Orders never change account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountAction { Activate, Deactivate, Suspend }

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    merchants: Arc<dyn MerchantRepository>,
    default_currency: Currency,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, merchants: Arc<dyn MerchantRepository>, default_currency: Currency) -> Self {
        Self { users, merchants, default_currency }
    }

    fn currency(&self, code: Option<&str>) -> Result<Currency> {
        match code {
            Some(code) => Ok(Currency::new(code)?),
            None => Ok(self.default_currency.clone()),
        }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        request.validate()?;
        if self.users.exists_by_username(request.username.trim()).await? {
            return Err(EcommerceError::validation(format!("username already exists: {}", request.username)));
        }
        let email = request.email.trim().to_lowercase();
        if self.users.exists_by_email(&email).await? {
            return Err(EcommerceError::validation(format!("email already exists: {email}")));
        }
        let user = User::create(&request.username, &email, self.currency(request.currency.as_deref())?)?;
        let saved = self.users.save(user).await?;
        tracing::info!(user_id = %saved.id(), "user created");
        Ok(saved)
    }

    #[instrument(skip(self, request))]
    pub async fn recharge_user(&self, user_id: UserId, request: RechargeRequest) -> Result<User> {
        request.validate()?;
        let mut user = self.require_user(user_id).await?;
        let currency = match request.currency.as_deref() {
            Some(code) => Currency::new(code)?,
            None => user.balance().currency().clone(),
        };
        user.recharge(&Money::new(request.amount, currency)?)?;
        let saved = self.users.save(user).await?;
        tracing::info!(user_id = %user_id, balance = %saved.balance(), "user recharged");
        Ok(saved)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.users.find_by_id(user_id).await?)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.find_by_username(username.trim()).await?)
    }

    pub async fn change_user_status(&self, user_id: UserId, action: AccountAction) -> Result<User> {
        let mut user = self.require_user(user_id).await?;
        match action {
            AccountAction::Activate => user.activate(),
            AccountAction::Deactivate => user.deactivate(),
            AccountAction::Suspend => return Err(EcommerceError::validation("users cannot be suspended")),
        }
        Ok(self.users.save(user).await?)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_merchant(&self, request: CreateMerchantRequest) -> Result<Merchant> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();
        if self.merchants.exists_by_email(&email).await? {
            return Err(EcommerceError::validation(format!("email already exists: {email}")));
        }
        let opening = Money::zero(self.currency(request.currency.as_deref())?);
        let merchant = Merchant::create(&request.name, &email, request.phone.as_deref(), opening)?;
        let saved = self.merchants.save(merchant).await?;
        tracing::info!(merchant_id = %saved.id(), "merchant created");
        Ok(saved)
    }

    pub async fn get_merchant(&self, merchant_id: MerchantId) -> Result<Option<Merchant>> {
        Ok(self.merchants.find_by_id(merchant_id).await?)
    }

    pub async fn get_merchant_by_email(&self, email: &str) -> Result<Option<Merchant>> {
        Ok(self.merchants.find_by_email(&email.trim().to_lowercase()).await?)
    }

    pub async fn change_merchant_status(&self, merchant_id: MerchantId, action: AccountAction) -> Result<Merchant> {
        let mut merchant = self
            .merchants
            .find_by_id(merchant_id)
            .await?
            .ok_or_else(|| EcommerceError::validation(format!("merchant not found: {merchant_id}")))?;
        match action {
            AccountAction::Activate => merchant.activate(),
            AccountAction::Deactivate => merchant.deactivate(),
            AccountAction::Suspend => merchant.suspend(),
        }
        Ok(self.merchants.save(merchant).await?)
    }

    async fn require_user(&self, user_id: UserId) -> Result<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| EcommerceError::validation(format!("user not found: {user_id}")))
    }
}
