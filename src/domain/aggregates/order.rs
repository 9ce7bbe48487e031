//! Order Aggregate
//!
//! PENDING -> CONFIRMED -> COMPLETED, with CANCELLED reachable from either
//! non-terminal state. Items are snapshots of the product at order time and
//! may only be appended while PENDING.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::meta::{AggregateMeta, MerchantId, OrderId, UserId};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, MoneyError, Sku};
use crate::ErrorKind;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] Pending, Confirmed, Completed, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
    pub fn is_terminal(&self) -> bool { matches!(self, Self::Completed | Self::Cancelled) }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    sku: Sku,
    product_name: String,
    unit_price: Money,
    quantity: u32,
    total_price: Money,
}

impl OrderItem {
    pub fn new(sku: Sku, product_name: &str, unit_price: Money, quantity: u32) -> Result<Self, OrderError> {
        let product_name = product_name.trim();
        if product_name.is_empty() { return Err(OrderError::MissingProductName); }
        if quantity == 0 { return Err(OrderError::InvalidQuantity); }
        let total_price = unit_price.multiply(quantity)?;
        Ok(Self { sku, product_name: product_name.to_string(), unit_price, quantity, total_price })
    }

    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn product_name(&self) -> &str { &self.product_name }
    pub fn unit_price(&self) -> &Money { &self.unit_price }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn total_price(&self) -> &Money { &self.total_price }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    meta: AggregateMeta<OrderId>,
    order_number: String,
    user_id: UserId,
    merchant_id: MerchantId,
    total_amount: Option<Money>,
    status: OrderStatus,
    order_time: DateTime<Utc>,
    items: Vec<OrderItem>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.order_number == other.order_number
            && self.user_id == other.user_id
            && self.merchant_id == other.merchant_id
            && self.total_amount == other.total_amount
            && self.status == other.status
            && self.order_time == other.order_time
            && self.items == other.items
    }
}

/// Persisted order columns, used to rebuild an `Order` from storage.
pub struct OrderSnapshot {
    pub meta: AggregateMeta<OrderId>,
    pub order_number: String,
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub total_amount: Option<Money>,
    pub status: OrderStatus,
    pub order_time: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn create(order_number: &str, user_id: UserId, merchant_id: MerchantId) -> Result<Self, OrderError> {
        let order_number = order_number.trim();
        if order_number.is_empty() { return Err(OrderError::MissingOrderNumber); }
        let mut order = Self {
            meta: AggregateMeta::new(OrderId::new()),
            order_number: order_number.to_string(),
            user_id,
            merchant_id,
            total_amount: None,
            status: OrderStatus::Pending,
            order_time: Utc::now(),
            items: vec![],
            events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created {
            order_id: order.id(), order_number: order.order_number.clone(), user_id, merchant_id,
        }));
        Ok(order)
    }

    pub fn restore(snapshot: OrderSnapshot) -> Self {
        let OrderSnapshot { meta, order_number, user_id, merchant_id, total_amount, status, order_time, items } = snapshot;
        Self { meta, order_number, user_id, merchant_id, total_amount, status, order_time, items, events: vec![] }
    }

    pub fn id(&self) -> OrderId { self.meta.id }
    pub fn meta(&self) -> &AggregateMeta<OrderId> { &self.meta }
    pub fn meta_mut(&mut self) -> &mut AggregateMeta<OrderId> { &mut self.meta }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn merchant_id(&self) -> MerchantId { self.merchant_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total_amount(&self) -> Option<&Money> { self.total_amount.as_ref() }
    pub fn order_time(&self) -> DateTime<Utc> { self.order_time }
    pub fn items(&self) -> &[OrderItem] { &self.items }

    /// Appends a snapshot line. The total is recomputed before the item is
    /// kept, so a currency mismatch leaves the order untouched.
    pub fn add_order_item(&mut self, sku: Sku, product_name: &str, unit_price: Money, quantity: u32) -> Result<(), OrderError> {
        self.require(OrderStatus::Pending, "add items to")?;
        let item = OrderItem::new(sku, product_name, unit_price, quantity)?;
        let total = match &self.total_amount {
            Some(total) => total.add(&item.total_price)?,
            None => item.total_price.clone(),
        };
        self.items.push(item);
        self.total_amount = Some(total);
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), OrderError> {
        self.require(OrderStatus::Pending, "confirm")?;
        let total = self.total_amount.clone().ok_or(OrderError::NoItems)?;
        self.status = OrderStatus::Confirmed;
        self.raise_event(DomainEvent::Order(OrderEvent::Confirmed {
            order_id: self.id(), order_number: self.order_number.clone(), total,
        }));
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), OrderError> {
        self.require(OrderStatus::Confirmed, "complete")?;
        self.status = OrderStatus::Completed;
        if let Some(total) = self.total_amount.clone() {
            self.raise_event(DomainEvent::Order(OrderEvent::Completed {
                order_id: self.id(), order_number: self.order_number.clone(), total,
            }));
        }
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::InvalidTransition { from: self.status, action: "cancel" });
        }
        self.status = OrderStatus::Cancelled;
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id(), order_number: self.order_number.clone() }));
        Ok(())
    }

    pub fn can_be_paid(&self) -> bool {
        self.status == OrderStatus::Pending && self.total_amount.as_ref().is_some_and(|t| !t.is_zero())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn require(&self, expected: OrderStatus, action: &'static str) -> Result<(), OrderError> {
        if self.status != expected { return Err(OrderError::InvalidTransition { from: self.status, action }); }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("order number cannot be empty")]
    MissingOrderNumber,
    #[error("product name cannot be empty")]
    MissingProductName,
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("cannot confirm an order without items")]
    NoItems,
    #[error("cannot {action} order in status {from}")]
    InvalidTransition { from: OrderStatus, action: &'static str },
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingOrderNumber | Self::MissingProductName | Self::InvalidQuantity => ErrorKind::Validation,
            Self::NoItems | Self::InvalidTransition { .. } => ErrorKind::StateConflict,
            Self::Money(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::MAX_AMOUNT;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn cny(v: Decimal) -> Money { Money::of(v, "CNY").unwrap() }
    fn order() -> Order { Order::create("ORD20240101120000001", UserId::new(), MerchantId::new()).unwrap() }

    #[test]
    fn test_order_workflow() {
        let mut order = order();
        assert_eq!(order.total_amount(), None);
        order.add_order_item(Sku::new("w001").unwrap(), "Widget", cny(dec!(10)), 2).unwrap();
        order.add_order_item(Sku::new("g002").unwrap(), "Gadget", cny(dec!(2.5)), 3).unwrap();
        assert_eq!(order.total_amount(), Some(&cny(dec!(27.50))));
        assert!(order.can_be_paid());
        order.confirm().unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        order.complete().unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.take_events().len(), 3);
    }

    #[test]
    fn confirm_without_items_is_a_state_conflict() {
        let mut order = order();
        let err = order.confirm().unwrap_err();
        assert_eq!(err, OrderError::NoItems);
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn complete_requires_confirmed() {
        let mut order = order();
        assert!(matches!(order.complete(), Err(OrderError::InvalidTransition { from: OrderStatus::Pending, .. })));
    }

    #[test]
    fn items_only_while_pending() {
        let mut order = order();
        order.add_order_item(Sku::new("A").unwrap(), "A", cny(dec!(1)), 1).unwrap();
        order.confirm().unwrap();
        let err = order.add_order_item(Sku::new("B").unwrap(), "B", cny(dec!(1)), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(order.items().len(), 1);
    }

    #[test]
    fn cancel_is_rejected_once_terminal() {
        let mut pending = order();
        pending.cancel().unwrap();
        assert!(pending.cancel().is_err());

        let mut done = order();
        done.add_order_item(Sku::new("A").unwrap(), "A", cny(dec!(1)), 1).unwrap();
        done.confirm().unwrap();
        done.complete().unwrap();
        assert_eq!(done.cancel(), Err(OrderError::InvalidTransition { from: OrderStatus::Completed, action: "cancel" }));
    }

    #[test]
    fn confirmed_order_can_be_cancelled_once() {
        let mut order = order();
        order.add_order_item(Sku::new("A").unwrap(), "A", cny(dec!(1)), 1).unwrap();
        order.confirm().unwrap();
        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(!order.can_be_paid());

        let err = order.cancel().unwrap_err();
        assert_eq!(err, OrderError::InvalidTransition { from: OrderStatus::Cancelled, action: "cancel" });
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert!(matches!(order.complete(), Err(OrderError::InvalidTransition { from: OrderStatus::Cancelled, .. })));
    }

    #[test]
    fn overflowing_line_total_is_rejected() {
        let mut order = order();
        let err = order.add_order_item(Sku::new("A").unwrap(), "A", cny(MAX_AMOUNT), 2).unwrap_err();
        assert_eq!(err, OrderError::Money(MoneyError::Overflow));
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert!(order.items().is_empty());

        order.add_order_item(Sku::new("A").unwrap(), "A", cny(MAX_AMOUNT), 1).unwrap();
        assert!(order.add_order_item(Sku::new("B").unwrap(), "B", cny(dec!(0.01)), 1).is_err());
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.total_amount(), Some(&cny(MAX_AMOUNT)));
    }

    #[test]
    fn mismatched_currency_item_is_not_kept() {
        let mut order = order();
        order.add_order_item(Sku::new("A").unwrap(), "A", cny(dec!(1)), 1).unwrap();
        let usd = Money::of(dec!(1), "USD").unwrap();
        assert!(matches!(order.add_order_item(Sku::new("B").unwrap(), "B", usd, 1), Err(OrderError::Money(_))));
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.total_amount(), Some(&cny(dec!(1))));
    }

    #[test]
    fn zero_quantity_item_is_a_validation_error() {
        let err = OrderItem::new(Sku::new("A").unwrap(), "A", cny(dec!(1)), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
