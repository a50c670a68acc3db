use common::{ReservationCode, ReservationStatus};
use record_store::{NewReservation, RecordStore, ReservationQuery, ReservationRecord};

use crate::error::DomainError;

use super::payload::{CreateReservationRequest, CreatedReservation, UpdateReservationRequest};

/// Service for managing table reservations.
pub struct ReservationService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> ReservationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetches a reservation by code.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, code: &str) -> Result<ReservationRecord, DomainError> {
        let code = ReservationCode::from(code);
        self.store.find_reservation(&code).await.map_err(|e| {
            if e.is_no_rows() {
                DomainError::reservation_not_found(&code)
            } else {
                e.into()
            }
        })
    }

    /// Writes the supplied fields of a reservation.
    ///
    /// A missing reservation surfaces as a store error.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        code: &str,
        request: UpdateReservationRequest,
    ) -> Result<ReservationRecord, DomainError> {
        let patch = request.into_patch()?;
        let updated = self
            .store
            .update_reservation(&ReservationCode::from(code), patch)
            .await?;

        tracing::info!(
            reservation_code = %updated.reservation_code,
            status = %updated.status,
            "reservation updated"
        );
        Ok(updated)
    }

    /// Lists reservations, optionally for one guest email.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, email: Option<String>) -> Result<Vec<ReservationRecord>, DomainError> {
        let query = match email.filter(|e| !e.is_empty()) {
            Some(email) => ReservationQuery::new().email(email),
            None => ReservationQuery::new(),
        };
        Ok(self.store.list_reservations(query).await?)
    }

    /// Books a table with a freshly generated reservation code.
    #[tracing::instrument(skip_all)]
    pub async fn create(
        &self,
        request: CreateReservationRequest,
    ) -> Result<CreatedReservation, DomainError> {
        let details = request.into_details()?;
        let reservation = self
            .store
            .insert_reservation(NewReservation {
                reservation_code: ReservationCode::generate(),
                status: ReservationStatus::Pending,
                details,
            })
            .await?;

        metrics::counter!("reservations_created_total").increment(1);
        tracing::info!(reservation_code = %reservation.reservation_code, "reservation created");

        Ok(reservation.into())
    }
}
