//! Table reservations, addressed by their business code.

mod payload;
mod service;

pub use payload::{CreateReservationRequest, CreatedReservation, UpdateReservationRequest};
pub use service::ReservationService;

use common::ParseStatusError;
use thiserror::Error;

/// Errors that reject a reservation request.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("email and phone_number are required")]
    MissingContact,

    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),

    #[error("Reservation update contains no fields")]
    EmptyUpdate,
}
