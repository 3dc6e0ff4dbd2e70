//! Billing domain errors

use core_kernel::{MoneyError, ProductId};
use thiserror::Error;

/// Errors that can occur in the billing domain
///
/// Every failure inside a create or delete transaction aborts the whole
/// transaction before one of these is surfaced to the caller.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Missing or malformed input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A line asked for more units than remain available
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}, short by {shortfall}"
    )]
    InsufficientStock {
        product_id: ProductId,
        product_code: Option<String>,
        requested: u32,
        available: u32,
        shortfall: u32,
    },

    /// Referenced bill, product or customer is absent
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// Contention on numbering or stock; the whole operation may be retried
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// Persistence or connectivity failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Builds an `InsufficientStock` error, deriving the shortfall
    pub fn insufficient_stock(
        product_id: ProductId,
        product_code: Option<String>,
        requested: u32,
        available: u32,
    ) -> Self {
        BillingError::InsufficientStock {
            product_id,
            product_code,
            requested,
            available,
            shortfall: requested.saturating_sub(available),
        }
    }

    /// Builds a `NotFound` error
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        BillingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Builds an `InvalidRequest` error
    pub fn invalid(message: impl Into<String>) -> Self {
        BillingError::InvalidRequest(message.into())
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::InvalidRequest(_) => "invalid_request",
            BillingError::InsufficientStock { .. } => "insufficient_stock",
            BillingError::NotFound { .. } => "not_found",
            BillingError::TransactionConflict(_) => "transaction_conflict",
            BillingError::Internal(_) => "internal_error",
        }
    }

    /// Returns true if retrying the unchanged request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::TransactionConflict(_))
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, BillingError::NotFound { .. })
    }
}

impl From<MoneyError> for BillingError {
    fn from(error: MoneyError) -> Self {
        BillingError::InvalidRequest(format!("amount out of range: {}", error))
    }
}
