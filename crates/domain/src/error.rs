//! Domain error types.

use record_store::StoreError;
use thiserror::Error;

use crate::order::OrderError;
use crate::reservation::ReservationError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the record store.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// An order request was rejected.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// A reservation request was rejected.
    #[error("{0}")]
    Reservation(#[from] ReservationError),

    /// No record matched the lookup.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

impl DomainError {
    pub(crate) fn order_not_found(key: impl ToString) -> Self {
        DomainError::NotFound {
            entity: "Order",
            key: key.to_string(),
        }
    }

    pub(crate) fn reservation_not_found(key: impl ToString) -> Self {
        DomainError::NotFound {
            entity: "Reservation",
            key: key.to_string(),
        }
    }

    /// Returns true if the request itself was invalid.
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Order(_) | DomainError::Reservation(_))
    }
}
