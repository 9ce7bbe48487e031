#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

use opensase_orders::api::AppState;
use opensase_orders::application::dto::{CreateMerchantRequest, CreateOrderRequest, CreateProductRequest, CreateUserRequest, OrderItemRequest, RechargeRequest};
use opensase_orders::application::RetryPolicy;
use opensase_orders::domain::aggregates::{Merchant, MerchantId, Product, User, UserId};
use opensase_orders::domain::events::{DomainEvent, EventPublisher};
use opensase_orders::domain::repository::Repositories;
use opensase_orders::domain::value_objects::Currency;
use opensase_orders::infrastructure::InMemoryStore;

#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<DomainEvent>>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        self.events.lock().unwrap().extend(events);
    }
}

impl RecordingPublisher {
    pub fn subjects(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(DomainEvent::subject).collect()
    }
}

pub struct Harness {
    pub state: AppState,
    pub repos: Repositories,
    pub events: Arc<RecordingPublisher>,
}

pub fn harness() -> Harness {
    harness_with(RetryPolicy::default())
}

pub fn harness_with(retry: RetryPolicy) -> Harness {
    let repos = Repositories::from_store(Arc::new(InMemoryStore::new()));
    let events = Arc::new(RecordingPublisher::default());
    let state = AppState::new(repos.clone(), events.clone(), Currency::new("CNY").unwrap(), retry);
    Harness { state, repos, events }
}

impl Harness {
    pub async fn buyer(&self, username: &str, balance: Decimal) -> User {
        let user = self
            .state
            .accounts
            .create_user(CreateUserRequest { username: username.into(), email: format!("{username}@example.com"), currency: None })
            .await
            .unwrap();
        if balance > Decimal::ZERO {
            return self.state.accounts.recharge_user(user.id(), RechargeRequest { amount: balance, currency: None }).await.unwrap();
        }
        user
    }

    pub async fn merchant(&self, name: &str) -> Merchant {
        self.state
            .accounts
            .create_merchant(CreateMerchantRequest { name: name.into(), email: format!("{}@shop.example.com", name.to_lowercase()), phone: None, currency: None })
            .await
            .unwrap()
    }

    pub async fn product(&self, sku: &str, price: Decimal, stock: u32, merchant_id: MerchantId) -> Product {
        self.state
            .catalog
            .create_product(CreateProductRequest {
                sku: sku.into(),
                name: format!("Product {sku}"),
                description: None,
                price,
                currency: None,
                stock_quantity: stock,
                merchant_id,
            })
            .await
            .unwrap()
    }

    pub async fn user(&self, id: UserId) -> User {
        self.state.accounts.get_user(id).await.unwrap().unwrap()
    }

    pub async fn merchant_by_id(&self, id: MerchantId) -> Merchant {
        self.state.accounts.get_merchant(id).await.unwrap().unwrap()
    }

    pub async fn stock(&self, sku: &str) -> u32 {
        self.state.catalog.get_product(sku).await.unwrap().unwrap().stock_quantity()
    }
}

pub fn order(user_id: UserId, items: &[(&str, u32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id,
        items: items.iter().map(|(sku, quantity)| OrderItemRequest { sku: (*sku).into(), quantity: *quantity }).collect(),
    }
}
