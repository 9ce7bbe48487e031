//! Postgres store (sqlx)
//!
//! Inserts carry version 1; updates are `... WHERE id = $1 AND version = $n`
//! and a zero row count is a [`StoreError::Conflict`]. A commit is one
//! transaction with `SET LOCAL lock_timeout`, so a blocked row lock fails
//! with SQLSTATE 55P03 instead of waiting forever.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::aggregates::{
    AggregateMeta, Merchant, MerchantId, Order, OrderId, OrderItem, OrderSnapshot, Product, ProductId, User, UserId,
};
use crate::domain::repository::{
    ChangeSet, MerchantRepository, OrderFilter, OrderRepository, ProductFilter, ProductRepository, StoreError,
    StoreResult, UnitOfWork, UserRepository,
};
use crate::domain::value_objects::{Currency, Money, Sku};

const USER_COLUMNS: &str = "id, username, email, balance, currency, status, created_at, updated_at, version";
const MERCHANT_COLUMNS: &str = "id, name, email, phone, balance, currency, status, created_at, updated_at, version";
const PRODUCT_COLUMNS: &str =
    "id, sku, name, description, price, currency, stock_quantity, merchant_id, status, created_at, updated_at, version";
const ORDER_COLUMNS: &str =
    "id, order_number, user_id, merchant_id, total_amount, currency, status, order_time, created_at, updated_at, version";

/// Maps driver errors onto the store taxonomy by SQLSTATE.
fn db_error(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        match db.code().as_deref() {
            Some("23505") => {
                let entity = match db.table() {
                    Some("users") => "user",
                    Some("merchants") => "merchant",
                    Some("products") => "product",
                    Some("orders") => "order",
                    _ => "row",
                };
                let key = db.constraint().unwrap_or("unique key").to_string();
                return StoreError::Duplicate { entity, key };
            }
            Some("55P03") => return StoreError::LockTimeout,
            Some("40001") | Some("40P01") => {
                return StoreError::Conflict { entity: "transaction", id: db.message().to_string() };
            }
            _ => {}
        }
    }
    StoreError::Database(err.to_string())
}

fn corrupt(entity: &'static str) -> impl Fn(String) -> StoreError {
    move |reason| StoreError::Corrupt { entity, reason }
}

fn money(entity: &'static str, amount: Decimal, currency: &str) -> StoreResult<Money> {
    let currency = Currency::new(currency).map_err(|e| corrupt(entity)(e.to_string()))?;
    Money::new(amount, currency).map_err(|e| corrupt(entity)(e.to_string()))
}

fn stored_count(entity: &'static str, value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| corrupt(entity)(format!("count {value} out of range")))
}

fn loaded_count(entity: &'static str, value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| corrupt(entity)(format!("negative count {value}")))
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    balance: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;
    fn try_from(row: UserRow) -> StoreResult<Self> {
        let meta = AggregateMeta::restore(UserId::from_uuid(row.id), row.created_at, row.updated_at, row.version);
        let status = row.status.parse().map_err(corrupt("user"))?;
        Ok(User::restore(meta, row.username, row.email, money("user", row.balance, &row.currency)?, status))
    }
}

#[derive(FromRow)]
struct MerchantRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    balance: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<MerchantRow> for Merchant {
    type Error = StoreError;
    fn try_from(row: MerchantRow) -> StoreResult<Self> {
        let meta = AggregateMeta::restore(MerchantId::from_uuid(row.id), row.created_at, row.updated_at, row.version);
        let status = row.status.parse().map_err(corrupt("merchant"))?;
        let balance = money("merchant", row.balance, &row.currency)?;
        Ok(Merchant::restore(meta, row.name, row.email, row.phone, balance, status))
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    description: Option<String>,
    price: Decimal,
    currency: String,
    stock_quantity: i32,
    merchant_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(row: ProductRow) -> StoreResult<Self> {
        let meta = AggregateMeta::restore(ProductId::from_uuid(row.id), row.created_at, row.updated_at, row.version);
        Ok(Product::restore(
            meta,
            Sku::new(row.sku).map_err(|e| corrupt("product")(e.to_string()))?,
            row.name,
            row.description,
            money("product", row.price, &row.currency)?,
            loaded_count("product", row.stock_quantity)?,
            MerchantId::from_uuid(row.merchant_id),
            row.status.parse().map_err(corrupt("product"))?,
        ))
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    merchant_id: Uuid,
    total_amount: Option<Decimal>,
    currency: Option<String>,
    status: String,
    order_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

#[derive(FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    sku: String,
    product_name: String,
    unit_price: Decimal,
    currency: String,
    quantity: i32,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> StoreResult<Order> {
        let total_amount = match (self.total_amount, self.currency.as_deref()) {
            (Some(amount), Some(currency)) => Some(money("order", amount, currency)?),
            (None, _) => None,
            (Some(_), None) => return Err(corrupt("order")("total without currency".into())),
        };
        let items = items
            .into_iter()
            .map(|item| {
                let sku = Sku::new(item.sku).map_err(|e| corrupt("order")(e.to_string()))?;
                let price = money("order", item.unit_price, &item.currency)?;
                let quantity = loaded_count("order", item.quantity)?;
                OrderItem::new(sku, &item.product_name, price, quantity).map_err(|e| corrupt("order")(e.to_string()))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Order::restore(OrderSnapshot {
            meta: AggregateMeta::restore(OrderId::from_uuid(self.id), self.created_at, self.updated_at, self.version),
            order_number: self.order_number,
            user_id: UserId::from_uuid(self.user_id),
            merchant_id: MerchantId::from_uuid(self.merchant_id),
            total_amount,
            status: self.status.parse().map_err(corrupt("order"))?,
            order_time: self.order_time,
            items,
        }))
    }
}

pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32, lock_timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await.map_err(db_error)?;
        Ok(Self::new(pool, lock_timeout))
    }

    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self { Self { pool, lock_timeout } }

    pub fn pool(&self) -> &PgPool { &self.pool }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn load_orders(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT order_id, sku, product_name, unit_price, currency, quantity FROM order_items \
             WHERE order_id = ANY($1) ORDER BY order_id, line_no",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

async fn write_user(conn: &mut PgConnection, user: &mut User, now: DateTime<Utc>) -> StoreResult<()> {
    let expected = user.meta().version;
    let insert = user.meta().is_new();
    user.meta_mut().record_write(now);
    let meta = user.meta();
    let query = if insert {
        sqlx::query(
            "INSERT INTO users (id, username, email, balance, currency, status, created_at, updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(meta.id.as_uuid())
        .bind(user.username())
        .bind(user.email())
        .bind(user.balance().amount())
        .bind(user.balance().currency().as_str())
        .bind(user.status().as_str())
        .bind(meta.created_at)
        .bind(meta.updated_at)
        .bind(meta.version)
    } else {
        sqlx::query(
            "UPDATE users SET username = $2, email = $3, balance = $4, currency = $5, status = $6, updated_at = $7, \
             version = $8 WHERE id = $1 AND version = $9",
        )
        .bind(meta.id.as_uuid())
        .bind(user.username())
        .bind(user.email())
        .bind(user.balance().amount())
        .bind(user.balance().currency().as_str())
        .bind(user.status().as_str())
        .bind(meta.updated_at)
        .bind(meta.version)
        .bind(expected)
    };
    let result = query.execute(conn).await.map_err(db_error)?;
    if result.rows_affected() != 1 {
        return Err(StoreError::Conflict { entity: "user", id: meta.id.to_string() });
    }
    Ok(())
}

async fn write_merchant(conn: &mut PgConnection, merchant: &mut Merchant, now: DateTime<Utc>) -> StoreResult<()> {
    let expected = merchant.meta().version;
    let insert = merchant.meta().is_new();
    merchant.meta_mut().record_write(now);
    let meta = merchant.meta();
    let query = if insert {
        sqlx::query(
            "INSERT INTO merchants (id, name, email, phone, balance, currency, status, created_at, updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(meta.id.as_uuid())
        .bind(merchant.name())
        .bind(merchant.email())
        .bind(merchant.phone())
        .bind(merchant.balance().amount())
        .bind(merchant.balance().currency().as_str())
        .bind(merchant.status().as_str())
        .bind(meta.created_at)
        .bind(meta.updated_at)
        .bind(meta.version)
    } else {
        sqlx::query(
            "UPDATE merchants SET name = $2, email = $3, phone = $4, balance = $5, currency = $6, status = $7, \
             updated_at = $8, version = $9 WHERE id = $1 AND version = $10",
        )
        .bind(meta.id.as_uuid())
        .bind(merchant.name())
        .bind(merchant.email())
        .bind(merchant.phone())
        .bind(merchant.balance().amount())
        .bind(merchant.balance().currency().as_str())
        .bind(merchant.status().as_str())
        .bind(meta.updated_at)
        .bind(meta.version)
        .bind(expected)
    };
    let result = query.execute(conn).await.map_err(db_error)?;
    if result.rows_affected() != 1 {
        return Err(StoreError::Conflict { entity: "merchant", id: meta.id.to_string() });
    }
    Ok(())
}

async fn write_product(conn: &mut PgConnection, product: &mut Product, now: DateTime<Utc>) -> StoreResult<()> {
    let expected = product.meta().version;
    let insert = product.meta().is_new();
    product.meta_mut().record_write(now);
    let meta = product.meta();
    let stock = stored_count("product", product.stock_quantity())?;
    let query = if insert {
        sqlx::query(
            "INSERT INTO products (id, sku, name, description, price, currency, stock_quantity, merchant_id, status, \
             created_at, updated_at, version) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(meta.id.as_uuid())
        .bind(product.sku().as_str())
        .bind(product.name())
        .bind(product.description())
        .bind(product.price().amount())
        .bind(product.price().currency().as_str())
        .bind(stock)
        .bind(product.merchant_id().as_uuid())
        .bind(product.status().as_str())
        .bind(meta.created_at)
        .bind(meta.updated_at)
        .bind(meta.version)
    } else {
        sqlx::query(
            "UPDATE products SET sku = $2, name = $3, description = $4, price = $5, currency = $6, stock_quantity = $7, \
             merchant_id = $8, status = $9, updated_at = $10, version = $11 WHERE id = $1 AND version = $12",
        )
        .bind(meta.id.as_uuid())
        .bind(product.sku().as_str())
        .bind(product.name())
        .bind(product.description())
        .bind(product.price().amount())
        .bind(product.price().currency().as_str())
        .bind(stock)
        .bind(product.merchant_id().as_uuid())
        .bind(product.status().as_str())
        .bind(meta.updated_at)
        .bind(meta.version)
        .bind(expected)
    };
    let result = query.execute(conn).await.map_err(db_error)?;
    if result.rows_affected() != 1 {
        return Err(StoreError::Conflict { entity: "product", id: meta.id.to_string() });
    }
    Ok(())
}

async fn write_order(conn: &mut PgConnection, order: &mut Order, now: DateTime<Utc>) -> StoreResult<()> {
    let expected = order.meta().version;
    let insert = order.meta().is_new();
    order.meta_mut().record_write(now);
    let meta = order.meta().clone();
    let total = order.total_amount().map(Money::amount);
    let currency = order.total_amount().map(|m| m.currency().as_str().to_string());
    let query = if insert {
        sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, merchant_id, total_amount, currency, status, order_time, \
             created_at, updated_at, version) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(meta.id.as_uuid())
        .bind(order.order_number())
        .bind(order.user_id().as_uuid())
        .bind(order.merchant_id().as_uuid())
        .bind(total)
        .bind(currency)
        .bind(order.status().as_str())
        .bind(order.order_time())
        .bind(meta.created_at)
        .bind(meta.updated_at)
        .bind(meta.version)
    } else {
        sqlx::query(
            "UPDATE orders SET total_amount = $2, currency = $3, status = $4, updated_at = $5, version = $6 \
             WHERE id = $1 AND version = $7",
        )
        .bind(meta.id.as_uuid())
        .bind(total)
        .bind(currency)
        .bind(order.status().as_str())
        .bind(meta.updated_at)
        .bind(meta.version)
        .bind(expected)
    };
    let result = query.execute(&mut *conn).await.map_err(db_error)?;
    if result.rows_affected() != 1 {
        return Err(StoreError::Conflict { entity: "order", id: meta.id.to_string() });
    }

    sqlx::query("DELETE FROM order_items WHERE order_id = $1")
        .bind(meta.id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    for (line_no, item) in order.items().iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_items (order_id, line_no, sku, product_name, unit_price, currency, quantity, total_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(meta.id.as_uuid())
        .bind(line_no as i32)
        .bind(item.sku().as_str())
        .bind(item.product_name())
        .bind(item.unit_price().amount())
        .bind(item.unit_price().currency().as_str())
        .bind(stored_count("order", item.quantity())?)
        .bind(item.total_price().amount())
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn commit(&self, mut changes: ChangeSet) -> StoreResult<ChangeSet> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let now = Utc::now();
        for user in &mut changes.users {
            write_user(&mut tx, user, now).await?;
        }
        for merchant in &mut changes.merchants {
            write_merchant(&mut tx, merchant, now).await?;
        }
        for product in &mut changes.products {
            write_product(&mut tx, product, now).await?;
        }
        for order in &mut changes.orders {
            write_order(&mut tx, order, now).await?;
        }

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(
            users = changes.users.len(),
            merchants = changes.merchants.len(),
            products = changes.products.len(),
            orders = changes.orders.len(),
            "change set committed"
        );
        Ok(changes)
    }
}

fn single<T>(rows: Vec<T>, entity: &'static str) -> StoreResult<T> {
    rows.into_iter().next().ok_or_else(|| corrupt(entity)("commit returned no row".into()))
}

#[async_trait]
impl UserRepository for PgStore {
    async fn save(&self, user: User) -> StoreResult<User> {
        single(self.commit(ChangeSet { users: vec![user], ..ChangeSet::default() }).await?.users, "user")
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(User::try_from).transpose()
    }

    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}

#[async_trait]
impl MerchantRepository for PgStore {
    async fn save(&self, merchant: Merchant) -> StoreResult<Merchant> {
        single(self.commit(ChangeSet { merchants: vec![merchant], ..ChangeSet::default() }).await?.merchants, "merchant")
    }

    async fn find_by_id(&self, id: MerchantId) -> StoreResult<Option<Merchant>> {
        let row: Option<MerchantRow> =
            sqlx::query_as(&format!("SELECT {MERCHANT_COLUMNS} FROM merchants WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        row.map(Merchant::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Merchant>> {
        let row: Option<MerchantRow> =
            sqlx::query_as(&format!("SELECT {MERCHANT_COLUMNS} FROM merchants WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        row.map(Merchant::try_from).transpose()
    }

    async fn find_all(&self) -> StoreResult<Vec<Merchant>> {
        let rows: Vec<MerchantRow> = sqlx::query_as(&format!("SELECT {MERCHANT_COLUMNS} FROM merchants ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(Merchant::try_from).collect()
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn save(&self, product: Product) -> StoreResult<Product> {
        single(self.commit(ChangeSet { products: vec![product], ..ChangeSet::default() }).await?.products, "product")
    }

    async fn find_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
            .bind(sku.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(Product::try_from).transpose()
    }

    async fn find(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
        if let Some(merchant_id) = filter.merchant_id {
            qb.push(" AND merchant_id = ").push_bind(merchant_id.as_uuid());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY sku");
        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn exists_by_sku(&self, sku: &Sku) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE sku = $1)")
            .bind(sku.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn save(&self, order: Order) -> StoreResult<Order> {
        single(self.commit(ChangeSet { orders: vec![order], ..ChangeSet::default() }).await?.orders, "order")
    }

    async fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(self.load_orders(row.into_iter().collect()).await?.pop())
    }

    async fn find_by_order_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"))
                .bind(order_number)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(self.load_orders(row.into_iter().collect()).await?.pop())
    }

    async fn find(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id.as_uuid());
        }
        if let Some(merchant_id) = filter.merchant_id {
            qb.push(" AND merchant_id = ").push_bind(merchant_id.as_uuid());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some((start, end)) = filter.placed_between {
            qb.push(" AND order_time >= ").push_bind(start);
            qb.push(" AND order_time < ").push_bind(end);
        }
        qb.push(" ORDER BY order_time, id");
        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await.map_err(db_error)?;
        self.load_orders(rows).await
    }

    async fn exists_by_order_number(&self, order_number: &str) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE order_number = $1)")
            .bind(order_number)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}
