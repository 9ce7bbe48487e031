//! Merchant settlement reconciliation
//!
//! Settlement never moves money. It sums COMPLETED order totals for one
//! merchant over a half-open window and checks that the merchant's current
//! balance covers that sum. A shortfall is a warning, not an error.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::domain::aggregates::{MerchantId, OrderStatus};
use crate::domain::repository::{MerchantRepository, OrderFilter, OrderRepository};
use crate::domain::value_objects::Money;
use crate::{EcommerceError, Result};

/// `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SettlementWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(EcommerceError::validation(format!("settlement window start {start} must be before end {end}")));
        }
        Ok(Self { start, end })
    }

    /// The whole UTC day before `now`.
    pub fn previous_day(now: DateTime<Utc>) -> Self {
        let end = now.date_naive().and_time(NaiveTime::default()).and_utc();
        Self { start: end - ChronoDuration::days(1), end }
    }

    pub fn start(&self) -> DateTime<Utc> { self.start }
    pub fn end(&self) -> DateTime<Utc> { self.end }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// No completed orders in the window.
    NoOrders,
    /// Completed orders exist but their totals sum to zero.
    NoSales,
    Verified,
    /// Balance is below the window's sales.
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementReport {
    pub merchant_id: MerchantId,
    pub window: SettlementWindow,
    pub order_count: usize,
    pub total_sales: Money,
    pub merchant_balance: Money,
    pub outcome: SettlementOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DailySettlementSummary {
    pub reports: Vec<SettlementReport>,
    /// Merchants whose check failed, with the error text. Other merchants still ran.
    pub failures: Vec<(MerchantId, String)>,
}

impl DailySettlementSummary {
    pub fn mismatches(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome == SettlementOutcome::Mismatch).count()
    }
}

pub struct SettlementService {
    merchants: Arc<dyn MerchantRepository>,
    orders: Arc<dyn OrderRepository>,
    running: Mutex<HashMap<MerchantId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SettlementService {
    pub fn new(merchants: Arc<dyn MerchantRepository>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { merchants, orders, running: Mutex::new(HashMap::new()) }
    }

    fn merchant_lock(&self, merchant_id: MerchantId) -> Arc<tokio::sync::Mutex<()>> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(running.entry(merchant_id).or_default())
    }

    /// Reconcile one merchant. Runs for the same merchant are serialized.
    #[instrument(skip(self), fields(start = %window.start, end = %window.end))]
    pub async fn settle_merchant(&self, merchant_id: MerchantId, window: SettlementWindow) -> Result<SettlementReport> {
        let lock = self.merchant_lock(merchant_id);
        let _guard = lock.lock().await;

        let merchant = self
            .merchants
            .find_by_id(merchant_id)
            .await?
            .ok_or_else(|| EcommerceError::validation(format!("merchant not found: {merchant_id}")))?;

        let filter = OrderFilter::by_merchant(merchant_id)
            .with_status(OrderStatus::Completed)
            .placed_between(window.start, window.end);
        let orders = self.orders.find(&filter).await?;

        let balance = merchant.balance().clone();
        let mut total_sales = Money::zero(balance.currency().clone());
        for total in orders.iter().filter_map(|order| order.total_amount()) {
            total_sales = total_sales.add(total)?;
        }

        let outcome = if orders.is_empty() {
            tracing::info!(merchant_id = %merchant_id, "no completed orders in settlement window");
            SettlementOutcome::NoOrders
        } else if total_sales.is_zero() {
            tracing::info!(merchant_id = %merchant_id, orders = orders.len(), "completed orders carry no sales");
            SettlementOutcome::NoSales
        } else if balance.is_greater_than_or_equal(&total_sales)? {
            tracing::info!(merchant_id = %merchant_id, total_sales = %total_sales, balance = %balance, "settlement verified");
            SettlementOutcome::Verified
        } else {
            tracing::warn!(
                merchant_id = %merchant_id,
                merchant = %merchant.name(),
                total_sales = %total_sales,
                balance = %balance,
                "merchant balance below settled sales"
            );
            SettlementOutcome::Mismatch
        };

        Ok(SettlementReport {
            merchant_id,
            window,
            order_count: orders.len(),
            total_sales,
            merchant_balance: balance,
            outcome,
        })
    }

    /// Settle every merchant for the UTC day before `now`.
    ///
    /// Failing to list merchants fails the run; a failure for one merchant is
    /// recorded in the summary and the remaining merchants still settle.
    pub async fn run_daily(&self, now: DateTime<Utc>) -> Result<DailySettlementSummary> {
        let window = SettlementWindow::previous_day(now);
        tracing::info!(start = %window.start, end = %window.end, "daily settlement started");

        let merchants = self.merchants.find_all().await?;
        let mut summary = DailySettlementSummary::default();
        for merchant in merchants {
            match self.settle_merchant(merchant.id(), window).await {
                Ok(report) => summary.reports.push(report),
                Err(err) => {
                    tracing::error!(merchant_id = %merchant.id(), error = %err, "merchant settlement failed");
                    summary.failures.push((merchant.id(), err.to_string()));
                }
            }
        }

        tracing::info!(
            settled = summary.reports.len(),
            mismatches = summary.mismatches(),
            failures = summary.failures.len(),
            "daily settlement finished"
        );
        Ok(summary)
    }
}

/// Drives [`SettlementService::run_daily`] once a day at a fixed UTC time.
pub struct SettlementScheduler {
    service: Arc<SettlementService>,
    run_at: NaiveTime,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl SettlementScheduler {
    pub fn new(service: Arc<SettlementService>, run_at: NaiveTime, timeout: Duration, shutdown: CancellationToken) -> Self {
        Self { service, run_at, timeout, shutdown }
    }

    pub async fn run(self) {
        tracing::info!(run_at = %self.run_at.format("%H:%M"), "settlement scheduler started");
        loop {
            let wait = Self::duration_until_next_run(self.run_at, Utc::now());
            tracing::debug!(minutes = wait.as_secs() / 60, "next settlement run scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.run_once().await;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("settlement scheduler received shutdown signal");
                    return;
                }
            }
        }
    }

    async fn run_once(&self) {
        let run = self.service.run_daily(Utc::now());
        tokio::select! {
            result = tokio::time::timeout(self.timeout, run) => match result {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => tracing::error!(error = %err, "daily settlement aborted"),
                Err(_) => tracing::error!(timeout_secs = self.timeout.as_secs(), "daily settlement timed out"),
            },
            _ = self.shutdown.cancelled() => {
                tracing::warn!("daily settlement interrupted by shutdown");
            }
        }
    }

    /// Time from `now` to the next `run_at`; a run time equal to `now` waits a full day.
    pub fn duration_until_next_run(run_at: NaiveTime, now: DateTime<Utc>) -> Duration {
        let today = now.date_naive();
        let target_date = if now.time() >= run_at { today + ChronoDuration::days(1) } else { today };
        let target = target_date.and_time(run_at).and_utc();
        target.signed_duration_since(now).to_std().unwrap_or(Duration::from_secs(60))
    }
}
