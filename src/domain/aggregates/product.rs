//! Product Aggregate

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::meta::{AggregateMeta, MerchantId, ProductId};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Money, MoneyError, Quantity, Sku, SkuError};
use crate::ErrorKind;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus { #[default] Active, Inactive, Discontinued }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "ACTIVE", Self::Inactive => "INACTIVE", Self::Discontinued => "DISCONTINUED" }
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "DISCONTINUED" => Ok(Self::Discontinued),
            other => Err(format!("unknown product status {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    meta: AggregateMeta<ProductId>,
    sku: Sku,
    name: String,
    description: Option<String>,
    price: Money,
    stock: Quantity,
    merchant_id: MerchantId,
    status: ProductStatus,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.sku == other.sku
            && self.name == other.name
            && self.description == other.description
            && self.price == other.price
            && self.stock == other.stock
            && self.merchant_id == other.merchant_id
            && self.status == other.status
    }
}

impl Product {
    pub fn create(sku: Sku, name: &str, description: Option<&str>, price: Money, stock: u32, merchant_id: MerchantId) -> Result<Self, ProductError> {
        let name = name.trim();
        if name.is_empty() { return Err(ProductError::MissingName); }
        if !price.is_positive() { return Err(ProductError::InvalidPrice); }
        let stock = Quantity::bounded(stock).ok_or(ProductError::StockOverflow)?;
        Ok(Self {
            meta: AggregateMeta::new(ProductId::new()),
            sku,
            name: name.to_string(),
            description: description.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
            price,
            stock,
            merchant_id,
            status: ProductStatus::Active,
            events: vec![],
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        meta: AggregateMeta<ProductId>,
        sku: Sku,
        name: String,
        description: Option<String>,
        price: Money,
        stock: u32,
        merchant_id: MerchantId,
        status: ProductStatus,
    ) -> Self {
        Self { meta, sku, name, description, price, stock: Quantity::new(stock), merchant_id, status, events: vec![] }
    }

    pub fn id(&self) -> ProductId { self.meta.id }
    pub fn meta(&self) -> &AggregateMeta<ProductId> { &self.meta }
    pub fn meta_mut(&mut self) -> &mut AggregateMeta<ProductId> { &mut self.meta }
    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn price(&self) -> &Money { &self.price }
    pub fn stock_quantity(&self) -> u32 { self.stock.value() }
    pub fn merchant_id(&self) -> MerchantId { self.merchant_id }
    pub fn status(&self) -> ProductStatus { self.status }

    pub fn add_stock(&mut self, quantity: u32) -> Result<(), ProductError> {
        self.guard_mutation(quantity)?;
        self.stock = self.stock.checked_add(quantity).ok_or(ProductError::StockOverflow)?;
        self.raise_event(DomainEvent::Product(ProductEvent::StockAdded {
            product_id: self.id(), sku: self.sku.clone(), quantity, stock: self.stock.value(),
        }));
        Ok(())
    }

    pub fn reduce_stock(&mut self, quantity: u32) -> Result<(), ProductError> {
        self.guard_mutation(quantity)?;
        self.stock = self.stock.subtract(quantity).ok_or_else(|| self.insufficient(quantity))?;
        self.raise_event(DomainEvent::Product(ProductEvent::StockReduced {
            product_id: self.id(), sku: self.sku.clone(), quantity, stock: self.stock.value(),
        }));
        Ok(())
    }

    /// Read-only; a reservation must still go through `reduce_stock`.
    pub fn has_enough_stock(&self, quantity: u32) -> bool { self.stock.covers(quantity) }

    pub fn calculate_total_price(&self, quantity: u32) -> Result<Money, ProductError> {
        if quantity == 0 { return Err(ProductError::InvalidQuantity); }
        Ok(self.price.multiply(quantity)?)
    }

    pub fn update_price(&mut self, price: Money) -> Result<(), ProductError> {
        if self.status != ProductStatus::Active { return Err(ProductError::NotActive(self.status)); }
        if !price.is_positive() { return Err(ProductError::InvalidPrice); }
        self.price = price;
        Ok(())
    }

    pub fn activate(&mut self) { self.status = ProductStatus::Active; }
    pub fn deactivate(&mut self) { self.status = ProductStatus::Inactive; }
    pub fn discontinue(&mut self) { self.status = ProductStatus::Discontinued; }

    pub(crate) fn insufficient(&self, requested: u32) -> ProductError {
        ProductError::InsufficientStock { sku: self.sku.clone(), available: self.stock.value(), requested }
    }

    fn guard_mutation(&self, quantity: u32) -> Result<(), ProductError> {
        if quantity == 0 { return Err(ProductError::InvalidQuantity); }
        if self.status != ProductStatus::Active { return Err(ProductError::NotActive(self.status)); }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProductError {
    #[error("product name cannot be empty")]
    MissingName,
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("price must be positive")]
    InvalidPrice,
    #[error("stock cannot exceed {}", Quantity::MAX)]
    StockOverflow,
    #[error("product is {}", .0.as_str())]
    NotActive(ProductStatus),
    #[error("insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock { sku: Sku, available: u32, requested: u32 },
    #[error(transparent)]
    Sku(#[from] SkuError),
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl ProductError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingName | Self::InvalidPrice | Self::InvalidQuantity | Self::StockOverflow | Self::Sku(_) => {
                ErrorKind::Validation
            }
            Self::NotActive(_) | Self::InsufficientStock { .. } => ErrorKind::StateConflict,
            Self::Money(e) => e.kind(),
        }
    }
}
