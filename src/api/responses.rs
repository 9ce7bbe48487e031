//! Response bodies
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::aggregates::{
    Merchant, MerchantId, MerchantStatus, Order, OrderId, OrderItem, OrderStatus, Product, ProductId, ProductStatus,
    User, UserId, UserStatus,
};
use crate::domain::value_objects::{Money, Sku};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId, pub username: String, pub email: String, pub balance: Money, pub status: UserStatus,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>, pub version: i64,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id(), username: u.username().into(), email: u.email().into(), balance: u.balance().clone(), status: u.status(),
            created_at: u.meta().created_at, updated_at: u.meta().updated_at, version: u.meta().version,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MerchantResponse {
    pub id: MerchantId, pub name: String, pub email: String, pub phone: Option<String>, pub balance: Money,
    pub status: MerchantStatus, pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

impl From<Merchant> for MerchantResponse {
    fn from(m: Merchant) -> Self {
        Self {
            id: m.id(), name: m.name().into(), email: m.email().into(), phone: m.phone().map(Into::into),
            balance: m.balance().clone(), status: m.status(), created_at: m.meta().created_at, updated_at: m.meta().updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId, pub sku: Sku, pub name: String, pub description: Option<String>, pub price: Money,
    pub stock_quantity: u32, pub merchant_id: MerchantId, pub status: ProductStatus, pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id(), sku: p.sku().clone(), name: p.name().into(), description: p.description().map(Into::into),
            price: p.price().clone(), stock_quantity: p.stock_quantity(), merchant_id: p.merchant_id(), status: p.status(),
            updated_at: p.meta().updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse { pub sku: Sku, pub product_name: String, pub unit_price: Money, pub quantity: u32, pub total_price: Money }

impl From<&OrderItem> for OrderItemResponse {
    fn from(i: &OrderItem) -> Self {
        Self { sku: i.sku().clone(), product_name: i.product_name().into(), unit_price: i.unit_price().clone(), quantity: i.quantity(), total_price: i.total_price().clone() }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId, pub order_number: String, pub user_id: UserId, pub merchant_id: MerchantId,
    pub total_amount: Option<Money>, pub status: OrderStatus, pub order_time: DateTime<Utc>, pub items: Vec<OrderItemResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id(), order_number: o.order_number().into(), user_id: o.user_id(), merchant_id: o.merchant_id(),
            total_amount: o.total_amount().cloned(), status: o.status(), order_time: o.order_time(),
            items: o.items().iter().map(Into::into).collect(),
        }
    }
}
