//! Product catalog and stock administration

use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use super::dto::{AddStockRequest, CreateProductRequest, UpdatePriceRequest};
use crate::domain::aggregates::{MerchantId, Product, ProductStatus};
use crate::domain::events::EventPublisher;
use crate::domain::repository::{MerchantRepository, ProductFilter, ProductRepository};
use crate::domain::value_objects::{Currency, Money, Sku};
use crate::{EcommerceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductAction { Activate, Deactivate, Discontinue }

pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    merchants: Arc<dyn MerchantRepository>,
    publisher: Arc<dyn EventPublisher>,
    default_currency: Currency,
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        merchants: Arc<dyn MerchantRepository>,
        publisher: Arc<dyn EventPublisher>,
        default_currency: Currency,
    ) -> Self {
        Self { products, merchants, publisher, default_currency }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(&self, request: CreateProductRequest) -> Result<Product> {
        request.validate()?;
        if self.merchants.find_by_id(request.merchant_id).await?.is_none() {
            return Err(EcommerceError::validation(format!("merchant not found: {}", request.merchant_id)));
        }
        let sku = Sku::new(request.sku)?;
        if self.products.exists_by_sku(&sku).await? {
            return Err(EcommerceError::validation(format!("SKU already exists: {sku}")));
        }
        let currency = match request.currency.as_deref() {
            Some(code) => Currency::new(code)?,
            None => self.default_currency.clone(),
        };
        let product = Product::create(
            sku,
            &request.name,
            request.description.as_deref(),
            Money::new(request.price, currency)?,
            request.stock_quantity,
            request.merchant_id,
        )?;
        let saved = self.products.save(product).await?;
        tracing::info!(product_id = %saved.id(), stock = saved.stock_quantity(), "product created");
        Ok(saved)
    }

    #[instrument(skip(self, request))]
    pub async fn add_stock(&self, sku: &str, request: AddStockRequest) -> Result<Product> {
        request.validate()?;
        let mut product = self.require_product(sku).await?;
        product.add_stock(request.quantity)?;
        let events = product.take_events();
        let saved = self.products.save(product).await?;
        self.publisher.publish(events).await;
        tracing::info!(sku = %saved.sku(), stock = saved.stock_quantity(), "stock added");
        Ok(saved)
    }

    pub async fn update_price(&self, sku: &str, request: UpdatePriceRequest) -> Result<Product> {
        request.validate()?;
        let mut product = self.require_product(sku).await?;
        let currency = match request.currency.as_deref() {
            Some(code) => Currency::new(code)?,
            None => product.price().currency().clone(),
        };
        product.update_price(Money::new(request.price, currency)?)?;
        Ok(self.products.save(product).await?)
    }

    pub async fn change_status(&self, sku: &str, action: ProductAction) -> Result<Product> {
        let mut product = self.require_product(sku).await?;
        match action {
            ProductAction::Activate => product.activate(),
            ProductAction::Deactivate => product.deactivate(),
            ProductAction::Discontinue => product.discontinue(),
        }
        Ok(self.products.save(product).await?)
    }

    pub async fn get_product(&self, sku: &str) -> Result<Option<Product>> {
        let sku = Sku::new(sku)?;
        Ok(self.products.find_by_sku(&sku).await?)
    }

    /// A merchant's full catalog, or every active product when no merchant is given.
    pub async fn list_products(&self, merchant_id: Option<MerchantId>) -> Result<Vec<Product>> {
        let filter = match merchant_id {
            Some(id) => ProductFilter { merchant_id: Some(id), status: None },
            None => ProductFilter { merchant_id: None, status: Some(ProductStatus::Active) },
        };
        Ok(self.products.find(&filter).await?)
    }

    async fn require_product(&self, sku: &str) -> Result<Product> {
        let sku = Sku::new(sku)?;
        self.products
            .find_by_sku(&sku)
            .await?
            .ok_or_else(|| EcommerceError::validation(format!("product not found: {sku}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::CreateMerchantRequest;
    use crate::application::AccountService;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::infrastructure::nats::NoopPublisher;
    use crate::ErrorKind;
    use rust_decimal_macros::dec;

    async fn setup() -> (CatalogService, MerchantId) {
        let store = Arc::new(InMemoryStore::new());
        let cny = Currency::new("CNY").unwrap();
        let accounts = AccountService::new(store.clone(), store.clone(), cny.clone());
        let merchant = accounts
            .create_merchant(CreateMerchantRequest { name: "Acme".into(), email: "m@acme.io".into(), phone: None, currency: None })
            .await
            .unwrap();
        (CatalogService::new(store.clone(), store, Arc::new(NoopPublisher), cny), merchant.id())
    }

    fn widget(merchant_id: MerchantId) -> CreateProductRequest {
        CreateProductRequest {
            sku: "widget-1".into(),
            name: "Widget".into(),
            description: None,
            price: dec!(100),
            currency: None,
            stock_quantity: 10,
            merchant_id,
        }
    }

    #[tokio::test]
    async fn create_requires_known_merchant_and_unique_sku() {
        let (svc, merchant_id) = setup().await;
        assert_eq!(svc.create_product(widget(MerchantId::new())).await.unwrap_err().kind(), ErrorKind::Validation);
        let product = svc.create_product(widget(merchant_id)).await.unwrap();
        assert_eq!(product.sku().as_str(), "WIDGET-1");
        let mut dup = widget(merchant_id);
        dup.sku = "WIDGET-1".into();
        assert_eq!(svc.create_product(dup).await.unwrap_err().kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn add_stock_is_case_insensitive_on_sku() {
        let (svc, merchant_id) = setup().await;
        svc.create_product(widget(merchant_id)).await.unwrap();
        let product = svc.add_stock("widget-1", AddStockRequest { quantity: 5 }).await.unwrap();
        assert_eq!(product.stock_quantity(), 15);
        assert_eq!(product.meta().version, 2);
    }

    #[tokio::test]
    async fn discontinued_products_reject_stock_and_leave_active_listing() {
        let (svc, merchant_id) = setup().await;
        svc.create_product(widget(merchant_id)).await.unwrap();
        svc.change_status("WIDGET-1", ProductAction::Discontinue).await.unwrap();
        let err = svc.add_stock("WIDGET-1", AddStockRequest { quantity: 1 }).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert!(svc.list_products(None).await.unwrap().is_empty());
        assert_eq!(svc.list_products(Some(merchant_id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn price_updates_keep_currency_and_reject_zero() {
        let (svc, merchant_id) = setup().await;
        svc.create_product(widget(merchant_id)).await.unwrap();
        let product = svc.update_price("WIDGET-1", UpdatePriceRequest { price: dec!(79.999), currency: None }).await.unwrap();
        assert_eq!(product.price(), &Money::of(dec!(80.00), "CNY").unwrap());
        let err = svc.update_price("WIDGET-1", UpdatePriceRequest { price: dec!(0), currency: None }).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
