//! In-process store
//!
//! All tables live behind one `tokio::sync::RwLock`. A commit takes the write
//! lock, validates every row in the change set, and only then applies them,
//! so a failed commit leaves nothing behind. Waiting for the lock is bounded
//! by `lock_timeout` and surfaces as [`StoreError::LockTimeout`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::aggregates::{
    AggregateMeta, Merchant, MerchantId, Order, OrderId, Product, ProductId, User, UserId,
};
use crate::domain::repository::{
    ChangeSet, MerchantRepository, OrderFilter, OrderRepository, ProductFilter, ProductRepository, StoreError,
    StoreResult, UnitOfWork, UserRepository,
};
use crate::domain::value_objects::Sku;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    merchants: HashMap<MerchantId, Merchant>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
}

impl Tables {
    fn validate(&self, changes: &ChangeSet) -> StoreResult<()> {
        for user in &changes.users {
            check_version("user", user.meta(), self.users.get(&user.id()).map(|u| u.meta().version))?;
            let clash = self.users.values().filter(|u| u.id() != user.id());
            for other in clash {
                if other.username() == user.username() {
                    return Err(StoreError::Duplicate { entity: "user", key: format!("username {}", user.username()) });
                }
                if other.email() == user.email() {
                    return Err(StoreError::Duplicate { entity: "user", key: format!("email {}", user.email()) });
                }
            }
        }
        for merchant in &changes.merchants {
            check_version("merchant", merchant.meta(), self.merchants.get(&merchant.id()).map(|m| m.meta().version))?;
            if self.merchants.values().any(|m| m.id() != merchant.id() && m.email() == merchant.email()) {
                return Err(StoreError::Duplicate { entity: "merchant", key: format!("email {}", merchant.email()) });
            }
        }
        for product in &changes.products {
            check_version("product", product.meta(), self.products.get(&product.id()).map(|p| p.meta().version))?;
            if self.products.values().any(|p| p.id() != product.id() && p.sku() == product.sku()) {
                return Err(StoreError::Duplicate { entity: "product", key: format!("sku {}", product.sku()) });
            }
        }
        for order in &changes.orders {
            check_version("order", order.meta(), self.orders.get(&order.id()).map(|o| o.meta().version))?;
            if self.orders.values().any(|o| o.id() != order.id() && o.order_number() == order.order_number()) {
                return Err(StoreError::Duplicate { entity: "order", key: order.order_number().to_string() });
            }
        }
        Ok(())
    }
}

fn check_version<Id: std::fmt::Display>(entity: &'static str, meta: &AggregateMeta<Id>, stored: Option<i64>) -> StoreResult<()> {
    let fresh = match stored {
        None => meta.is_new(),
        Some(version) => !meta.is_new() && version == meta.version,
    };
    if fresh { Ok(()) } else { Err(StoreError::Conflict { entity, id: meta.id.to_string() }) }
}

pub struct InMemoryStore {
    tables: RwLock<Tables>,
    lock_timeout: Duration,
}

impl Default for InMemoryStore {
    fn default() -> Self { Self::new() }
}

impl InMemoryStore {
    pub fn new() -> Self { Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT) }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self { tables: RwLock::new(Tables::default()), lock_timeout }
    }

    async fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        tokio::time::timeout(self.lock_timeout, self.tables.read()).await.map_err(|_| StoreError::LockTimeout)
    }

    async fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        tokio::time::timeout(self.lock_timeout, self.tables.write()).await.map_err(|_| StoreError::LockTimeout)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn commit(&self, mut changes: ChangeSet) -> StoreResult<ChangeSet> {
        let mut tables = self.write().await?;
        tables.validate(&changes)?;

        let now = Utc::now();
        for user in &mut changes.users {
            user.meta_mut().record_write(now);
            tables.users.insert(user.id(), user.clone());
        }
        for merchant in &mut changes.merchants {
            merchant.meta_mut().record_write(now);
            tables.merchants.insert(merchant.id(), merchant.clone());
        }
        for product in &mut changes.products {
            product.meta_mut().record_write(now);
            let mut row = product.clone();
            row.take_events();
            tables.products.insert(row.id(), row);
        }
        for order in &mut changes.orders {
            order.meta_mut().record_write(now);
            let mut row = order.clone();
            row.take_events();
            tables.orders.insert(row.id(), row);
        }
        Ok(changes)
    }
}

fn single<T>(rows: Vec<T>, entity: &'static str) -> StoreResult<T> {
    rows.into_iter().next().ok_or_else(|| StoreError::Corrupt { entity, reason: "commit returned no row".into() })
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn save(&self, user: User) -> StoreResult<User> {
        single(self.commit(ChangeSet { users: vec![user], ..ChangeSet::default() }).await?.users, "user")
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read().await?.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.read().await?.users.values().find(|u| u.username() == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read().await?.users.values().find(|u| u.email() == email).cloned())
    }
}

#[async_trait]
impl MerchantRepository for InMemoryStore {
    async fn save(&self, merchant: Merchant) -> StoreResult<Merchant> {
        single(self.commit(ChangeSet { merchants: vec![merchant], ..ChangeSet::default() }).await?.merchants, "merchant")
    }

    async fn find_by_id(&self, id: MerchantId) -> StoreResult<Option<Merchant>> {
        Ok(self.read().await?.merchants.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Merchant>> {
        Ok(self.read().await?.merchants.values().find(|m| m.email() == email).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Merchant>> {
        let mut merchants: Vec<Merchant> = self.read().await?.merchants.values().cloned().collect();
        merchants.sort_by_key(|m| m.id());
        Ok(merchants)
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn save(&self, product: Product) -> StoreResult<Product> {
        single(self.commit(ChangeSet { products: vec![product], ..ChangeSet::default() }).await?.products, "product")
    }

    async fn find_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        Ok(self.read().await?.products.values().find(|p| p.sku() == sku).cloned())
    }

    async fn find(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.read().await?.products.values().filter(|p| filter.matches(p)).cloned().collect();
        products.sort_by(|a, b| a.sku().cmp(b.sku()));
        Ok(products)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn save(&self, order: Order) -> StoreResult<Order> {
        single(self.commit(ChangeSet { orders: vec![order], ..ChangeSet::default() }).await?.orders, "order")
    }

    async fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read().await?.orders.get(&id).cloned())
    }

    async fn find_by_order_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        Ok(self.read().await?.orders.values().find(|o| o.order_number() == order_number).cloned())
    }

    async fn find(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self.read().await?.orders.values().filter(|o| filter.matches(o)).cloned().collect();
        orders.sort_by_key(|o| (o.order_time(), o.id()));
        Ok(orders)
    }
}
