//! Domain events
use async_trait::async_trait;
use serde::Serialize;

use crate::domain::aggregates::{MerchantId, OrderId, ProductId, UserId};
use crate::domain::value_objects::{Money, Sku};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    StockAdded { product_id: ProductId, sku: Sku, quantity: u32, stock: u32 },
    StockReduced { product_id: ProductId, sku: Sku, quantity: u32, stock: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: OrderId, order_number: String, user_id: UserId, merchant_id: MerchantId },
    Confirmed { order_id: OrderId, order_number: String, total: Money },
    Completed { order_id: OrderId, order_number: String, total: Money },
    Cancelled { order_id: OrderId, order_number: String },
}

impl DomainEvent {
    /// Message subject, e.g. `orders.events.order.completed`.
    pub fn subject(&self) -> String {
        let (aggregate, kind) = match self {
            Self::Product(ProductEvent::StockAdded { .. }) => ("product", "stock_added"),
            Self::Product(ProductEvent::StockReduced { .. }) => ("product", "stock_reduced"),
            Self::Order(OrderEvent::Created { .. }) => ("order", "created"),
            Self::Order(OrderEvent::Confirmed { .. }) => ("order", "confirmed"),
            Self::Order(OrderEvent::Completed { .. }) => ("order", "completed"),
            Self::Order(OrderEvent::Cancelled { .. }) => ("order", "cancelled"),
        };
        format!("orders.events.{aggregate}.{kind}")
    }
}

/// Outbound sink for events drained after a successful commit.
///
/// Delivery is best-effort; implementations log failures instead of returning them.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>);
}
