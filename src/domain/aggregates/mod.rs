//! Aggregates module
mod account;
mod meta;
pub mod merchant;
pub mod order;
pub mod product;
pub mod user;

pub use account::AccountError;
pub use merchant::{Merchant, MerchantStatus};
pub use meta::{AggregateMeta, MerchantId, OrderId, ProductId, UserId};
pub use order::{Order, OrderError, OrderItem, OrderSnapshot, OrderStatus};
pub use product::{Product, ProductError, ProductStatus};
pub use user::{User, UserStatus};
