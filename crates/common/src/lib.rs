//! Shared identifier and status types for the restaurant ordering backend.

pub mod code;
pub mod status;
pub mod types;

pub use code::{SUFFIX_RANGE, business_code, random_suffix};
pub use status::{OrderStatus, ParseStatusError, PaymentStatus, ReservationStatus};
pub use types::{OrderId, OrderKey, OrderNumber, ReservationCode};
