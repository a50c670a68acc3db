//! Order lifecycle: creation, lookup, listing and status changes.

mod payload;
pub mod resolver;
mod service;
mod transitions;

pub use payload::{
    CreateOrderRequest, CreatedOrder, DEFAULT_PAGE_SIZE, OrderItemRequest, OrderListParams,
    OrderListing, PageMeta, PageRequest, StatusUpdateRequest,
};
pub use service::{OrderService, OrderSettings, OrderSummary, StatusBreakdown};
pub use transitions::{ParsePolicyError, TransitionPolicy, can_transition};

use common::{OrderStatus, ParseStatusError};
use thiserror::Error;

/// Errors that reject an order request before or instead of a store write.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Contact fields are required to place an order.
    #[error("customer_email and customer_phone are required")]
    MissingContact,

    /// A status value outside its enumerated domain.
    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),

    /// A status update that names neither status column.
    #[error("At least one of status or payment_status is required")]
    EmptyStatusUpdate,

    /// The fulfillment status cannot move between these states.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// A listing filter that could not be parsed.
    #[error("Invalid {field} filter '{value}'")]
    InvalidFilter { field: &'static str, value: String },
}
