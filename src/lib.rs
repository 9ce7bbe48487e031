//! OpenSASE Orders
//!
//! Order processing core for the OpenSASE commerce platform.
//!
//! ## Features
//! - Prepaid buyer balances and merchant revenue accounts
//! - Product catalog with stock tracking
//! - Atomic order workflow: stock, buyer debit and merchant credit commit together
//! - Daily merchant settlement reconciliation
//! - In-memory and Postgres stores behind the same repository ports

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use thiserror::Error;

use crate::domain::aggregates::{AccountError, OrderError, ProductError};
use crate::domain::repository::StoreError;
use crate::domain::value_objects::{MoneyError, SkuError};

pub use crate::api::AppState;

// =============================================================================
// Error Types
// =============================================================================

/// Coarse classification every failure maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, unknown reference or duplicate key. Fix the request.
    Validation,
    /// Valid request rejected by the current state of an aggregate.
    StateConflict,
    /// Persistence or transport failure.
    Infrastructure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::StateConflict => "state_conflict",
            Self::Infrastructure => "infrastructure",
        }
    }
}

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("storage error: {0}")]
    Infrastructure(StoreError),
}

impl EcommerceError {
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
    pub fn conflict(msg: impl Into<String>) -> Self { Self::StateConflict(msg.into()) }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(e) if e.is_retryable())
    }

    fn classified(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::StateConflict => Self::StateConflict(message),
            ErrorKind::Infrastructure => Self::Infrastructure(StoreError::Database(message)),
        }
    }
}

impl From<StoreError> for EcommerceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => Self::Validation(err.to_string()),
            other => Self::Infrastructure(other),
        }
    }
}

macro_rules! classify_domain_error {
    ($($err:ty),+ $(,)?) => {$(
        impl From<$err> for EcommerceError {
            fn from(err: $err) -> Self { Self::classified(err.kind(), err.to_string()) }
        }
    )+};
}

classify_domain_error!(MoneyError, SkuError, AccountError, ProductError, OrderError);

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(err: validator::ValidationErrors) -> Self { Self::Validation(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
