//! Domain layer for the restaurant ordering backend.
//!
//! This crate provides:
//! - Order identifier resolution (surrogate id or business order number)
//! - Order creation with transactional or compensating writes
//! - Filtered order listings and the dashboard summary
//! - Status updates checked against the fulfillment transition table
//! - Reservation lookup, update, listing and creation

pub mod error;
pub mod order;
pub mod reservation;

pub use error::DomainError;
pub use order::{
    CreateOrderRequest, CreatedOrder, DEFAULT_PAGE_SIZE, OrderError, OrderItemRequest,
    OrderListParams, OrderListing, OrderService, OrderSettings, OrderSummary, PageMeta,
    PageRequest, ParsePolicyError, StatusBreakdown, StatusUpdateRequest, TransitionPolicy,
    can_transition,
};
pub use reservation::{
    CreateReservationRequest, CreatedReservation, ReservationError, ReservationService,
    UpdateReservationRequest,
};
