//! Order workflow
//!
//! Every attempt reads a fresh snapshot of the buyer, the merchant and each
//! product, applies all effects in memory, then hands the whole set to
//! [`UnitOfWork::commit`]. The commit is version-checked per row, so two
//! workflows racing for the same stock cannot both win: the loser sees a
//! retryable conflict, re-reads, and fails the stock check on its next
//! attempt if nothing is left.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use validator::Validate;

use super::dto::CreateOrderRequest;
use super::order_number::OrderNumberGenerator;
use crate::domain::aggregates::{MerchantId, Order, Product, UserId};
use crate::domain::events::EventPublisher;
use crate::domain::repository::{ChangeSet, OrderFilter, Repositories, StoreError};
use crate::domain::value_objects::{Money, Sku};
use crate::{EcommerceError, Result};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Linear backoff with up to one extra `backoff` of jitter.
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff.saturating_mul(attempt);
        let jitter_ms = self.backoff.as_millis().min(u128::from(u32::MAX)) as u64;
        let jitter = if jitter_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..=jitter_ms) };
        base + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { max_attempts: 5, backoff: Duration::from_millis(20) } }
}

pub struct OrderService {
    repos: Repositories,
    publisher: Arc<dyn EventPublisher>,
    numbers: OrderNumberGenerator,
    retry: RetryPolicy,
}

impl OrderService {
    pub fn new(repos: Repositories, publisher: Arc<dyn EventPublisher>, retry: RetryPolicy) -> Self {
        Self { repos, publisher, numbers: OrderNumberGenerator::new(), retry }
    }

    /// Runs the purchase end to end and returns the COMPLETED order.
    ///
    /// Validation and state-conflict failures return immediately; contention
    /// on commit is retried up to `max_attempts` times.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, lines = request.items.len()))]
    pub async fn create_and_process_order(&self, request: CreateOrderRequest) -> Result<Order> {
        request.validate()?;
        let mut attempt = 1;
        loop {
            match self.process_once(&request).await {
                Ok(order) => return Ok(order),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    tracing::warn!(attempt, error = %err, "order commit contended, retrying");
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn process_once(&self, request: &CreateOrderRequest) -> Result<Order> {
        let mut user = self
            .repos
            .users
            .find_by_id(request.user_id)
            .await?
            .ok_or_else(|| EcommerceError::validation(format!("user not found: {}", request.user_id)))?;

        if request.items.is_empty() {
            return Err(EcommerceError::validation("order items cannot be empty"));
        }

        let mut lines: Vec<(Sku, u32)> = Vec::with_capacity(request.items.len());
        let mut products: HashMap<Sku, Product> = HashMap::new();
        for item in &request.items {
            if item.quantity == 0 {
                return Err(EcommerceError::validation(format!("quantity must be positive for {}", item.sku)));
            }
            let sku = Sku::new(item.sku.as_str())?;
            if !products.contains_key(&sku) {
                let product = self
                    .repos
                    .products
                    .find_by_sku(&sku)
                    .await?
                    .ok_or_else(|| EcommerceError::validation(format!("product not found: {sku}")))?;
                products.insert(sku.clone(), product);
            }
            lines.push((sku, item.quantity));
        }

        let merchant_id = single_merchant(&lines, &products)?;
        let mut merchant = self
            .repos
            .merchants
            .find_by_id(merchant_id)
            .await?
            .ok_or_else(|| EcommerceError::validation(format!("merchant not found: {merchant_id}")))?;

        let order_number = self.next_order_number().await?;
        let mut order = Order::create(&order_number, user.id(), merchant_id)?;
        tracing::debug!(order_number = %order_number, "order drafted");

        let mut total: Option<Money> = None;
        for (sku, quantity) in &lines {
            let product = &products[sku];
            if !product.has_enough_stock(*quantity) {
                return Err(product.insufficient(*quantity).into());
            }
            order.add_order_item(sku.clone(), product.name(), product.price().clone(), *quantity)?;
            let line_total = product.calculate_total_price(*quantity)?;
            total = Some(match total {
                Some(running) => running.add(&line_total)?,
                None => line_total,
            });
        }
        let total = total.ok_or_else(|| EcommerceError::validation("order items cannot be empty"))?;

        if !user.has_enough_balance(&total)? {
            return Err(EcommerceError::conflict(format!(
                "insufficient user balance: available {}, required {total}",
                user.balance()
            )));
        }

        order.confirm()?;

        let charge = order.total_amount().cloned().unwrap_or(total);
        user.deduct(&charge)?;
        merchant.add_revenue(&charge)?;
        for (sku, quantity) in &lines {
            if let Some(product) = products.get_mut(sku) {
                product.reduce_stock(*quantity)?;
            }
        }

        order.complete()?;

        let mut events = order.take_events();
        let mut touched: Vec<Product> = products.into_values().collect();
        for product in &mut touched {
            events.extend(product.take_events());
        }

        let committed = self
            .repos
            .unit_of_work
            .commit(ChangeSet { users: vec![user], merchants: vec![merchant], products: touched, orders: vec![order] })
            .await
            .map_err(|err| match err {
                // Another process claimed the number between the existence check and the commit.
                StoreError::Duplicate { entity: "order", key } => StoreError::Conflict { entity: "order", id: key },
                other => other,
            })?;
        let order = committed
            .orders
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Corrupt { entity: "order", reason: "commit returned no order".into() })?;

        tracing::info!(order_number = %order.order_number(), total = %charge, merchant_id = %merchant_id, "order completed");
        self.publisher.publish(events).await;
        Ok(order)
    }

    async fn next_order_number(&self) -> Result<String> {
        let mut candidate = self.numbers.next();
        for _ in 1..ORDER_NUMBER_ATTEMPTS {
            if !self.repos.orders.exists_by_order_number(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(order_number = %candidate, "order number taken, regenerating");
            candidate = self.numbers.next();
        }
        if self.repos.orders.exists_by_order_number(&candidate).await? {
            return Err(StoreError::Conflict { entity: "order", id: candidate }.into());
        }
        Ok(candidate)
    }

    pub async fn get_order(&self, order_number: &str) -> Result<Option<Order>> {
        Ok(self.repos.orders.find_by_order_number(order_number.trim()).await?)
    }

    pub async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.repos.orders.find(&OrderFilter::by_user(user_id)).await?)
    }

    pub async fn list_orders_by_merchant(&self, merchant_id: MerchantId) -> Result<Vec<Order>> {
        Ok(self.repos.orders.find(&OrderFilter::by_merchant(merchant_id)).await?)
    }
}

/// An order cannot span merchants.
fn single_merchant(lines: &[(Sku, u32)], products: &HashMap<Sku, Product>) -> Result<MerchantId> {
    let mut merchant_id = None;
    for (sku, _) in lines {
        let owner = products[sku].merchant_id();
        match merchant_id {
            None => merchant_id = Some(owner),
            Some(first) if first != owner => {
                return Err(EcommerceError::validation("all products must belong to the same merchant"));
            }
            Some(_) => {}
        }
    }
    merchant_id.ok_or_else(|| EcommerceError::validation("order items cannot be empty"))
}
