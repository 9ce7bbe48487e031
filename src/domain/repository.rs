//! Persistence ports
//!
//! One trait per aggregate plus a [`UnitOfWork`] that commits every aggregate
//! touched by a workflow as a single version-checked, all-or-nothing write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::aggregates::{
    Merchant, MerchantId, Order, OrderId, OrderStatus, Product, ProductStatus, User, UserId,
};
use crate::domain::value_objects::Sku;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: &'static str, id: String },
    #[error("timed out waiting for a row lock")]
    LockTimeout,
    #[error("{entity} with {key} already exists")]
    Duplicate { entity: &'static str, key: String },
    #[error("stored {entity} is unreadable: {reason}")]
    Corrupt { entity: &'static str, reason: String },
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Transient contention that a fresh attempt may not hit.
    pub fn is_retryable(&self) -> bool { matches!(self, Self::Conflict { .. } | Self::LockTimeout) }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Half-open `[start, end)` time filter plus optional equality filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub merchant_id: Option<MerchantId>,
    pub status: Option<OrderStatus>,
    pub placed_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl OrderFilter {
    pub fn by_user(user_id: UserId) -> Self { Self { user_id: Some(user_id), ..Self::default() } }
    pub fn by_merchant(merchant_id: MerchantId) -> Self { Self { merchant_id: Some(merchant_id), ..Self::default() } }
    pub fn with_status(mut self, status: OrderStatus) -> Self { self.status = Some(status); self }
    pub fn placed_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.placed_between = Some((start, end));
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |id| order.user_id() == id)
            && self.merchant_id.map_or(true, |id| order.merchant_id() == id)
            && self.status.map_or(true, |s| order.status() == s)
            && self.placed_between.map_or(true, |(start, end)| order.order_time() >= start && order.order_time() < end)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub merchant_id: Option<MerchantId>,
    pub status: Option<ProductStatus>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.merchant_id.map_or(true, |id| product.merchant_id() == id)
            && self.status.map_or(true, |s| product.status() == s)
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, user: User) -> StoreResult<User>;
    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }
    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }
}

#[async_trait]
pub trait MerchantRepository: Send + Sync {
    async fn save(&self, merchant: Merchant) -> StoreResult<Merchant>;
    async fn find_by_id(&self, id: MerchantId) -> StoreResult<Option<Merchant>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Merchant>>;
    async fn find_all(&self) -> StoreResult<Vec<Merchant>>;
    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn save(&self, product: Product) -> StoreResult<Product>;
    async fn find_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>>;
    async fn find(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;
    async fn exists_by_sku(&self, sku: &Sku) -> StoreResult<bool> {
        Ok(self.find_by_sku(sku).await?.is_some())
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save(&self, order: Order) -> StoreResult<Order>;
    async fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>>;
    async fn find_by_order_number(&self, order_number: &str) -> StoreResult<Option<Order>>;
    /// Ordered by `order_time`.
    async fn find(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;
    async fn exists_by_order_number(&self, order_number: &str) -> StoreResult<bool> {
        Ok(self.find_by_order_number(order_number).await?.is_some())
    }
}

/// Aggregates written together by one workflow invocation.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub users: Vec<User>,
    pub merchants: Vec<Merchant>,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.merchants.is_empty() && self.products.is_empty() && self.orders.is_empty()
    }
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Writes every aggregate or none. Each update must match the stored
    /// version, otherwise the whole set fails with [`StoreError::Conflict`].
    /// Returns the persisted forms with fresh versions and timestamps.
    async fn commit(&self, changes: ChangeSet) -> StoreResult<ChangeSet>;
}

/// Repository handles injected into the application services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub merchants: Arc<dyn MerchantRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
}

impl Repositories {
    /// Wire all ports to one backing store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + MerchantRepository + ProductRepository + OrderRepository + UnitOfWork + 'static,
    {
        Self {
            users: store.clone(),
            merchants: store.clone(),
            products: store.clone(),
            orders: store.clone(),
            unit_of_work: store,
        }
    }
}
