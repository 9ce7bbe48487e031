//! Application services
pub mod accounts;
pub mod catalog;
pub mod dto;
pub mod order_number;
pub mod ordering;
pub mod settlement;

pub use accounts::{AccountAction, AccountService};
pub use catalog::{CatalogService, ProductAction};
pub use order_number::OrderNumberGenerator;
pub use ordering::{OrderService, RetryPolicy};
pub use settlement::{
    DailySettlementSummary, SettlementOutcome, SettlementReport, SettlementScheduler, SettlementService,
    SettlementWindow,
};
