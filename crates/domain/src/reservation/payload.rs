use chrono::NaiveDate;
use common::ReservationStatus;
use record_store::{ReservationDetails, ReservationPatch, ReservationRecord};
use serde::{Deserialize, Serialize};

use super::ReservationError;

pub(crate) const RESERVATION_CREATED: &str = "Reservation created successfully";

/// Payload of `POST /reservations`. Fields accept snake_case or camelCase.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReservationRequest {
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(alias = "reservationDate")]
    pub reservation_date: Option<NaiveDate>,
    #[serde(alias = "reservationTime")]
    pub reservation_time: Option<String>,
    #[serde(alias = "numberOfGuests")]
    pub number_of_guests: Option<i32>,
    #[serde(alias = "specialRequests")]
    pub special_requests: Option<String>,
}

impl CreateReservationRequest {
    pub fn into_details(self) -> Result<ReservationDetails, ReservationError> {
        let email = self.email.filter(|v| !v.trim().is_empty());
        let phone_number = self.phone_number.filter(|v| !v.trim().is_empty());
        let (Some(email), Some(phone_number)) = (email, phone_number) else {
            return Err(ReservationError::MissingContact);
        };

        Ok(ReservationDetails {
            full_name: self.full_name,
            email,
            phone_number,
            reservation_date: self.reservation_date,
            reservation_time: self.reservation_time,
            number_of_guests: self.number_of_guests,
            special_requests: self.special_requests,
        })
    }
}

/// Payload of `PUT /reservations/{code}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReservationRequest {
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(alias = "reservationDate")]
    pub reservation_date: Option<NaiveDate>,
    #[serde(alias = "reservationTime")]
    pub reservation_time: Option<String>,
    #[serde(alias = "numberOfGuests")]
    pub number_of_guests: Option<i32>,
    #[serde(alias = "specialRequests")]
    pub special_requests: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl UpdateReservationRequest {
    pub fn into_patch(self) -> Result<ReservationPatch, ReservationError> {
        let patch = ReservationPatch {
            full_name: self.full_name,
            email: self.email,
            phone_number: self.phone_number,
            reservation_date: self.reservation_date,
            reservation_time: self.reservation_time,
            number_of_guests: self.number_of_guests,
            special_requests: self.special_requests,
            status: self
                .status
                .map(|s| s.parse::<ReservationStatus>())
                .transpose()?,
            notes: self.notes,
        };

        if patch.is_empty() {
            return Err(ReservationError::EmptyUpdate);
        }
        Ok(patch)
    }
}

/// Response of a successful reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedReservation {
    #[serde(flatten)]
    pub reservation: ReservationRecord,
    pub message: &'static str,
}

impl From<ReservationRecord> for CreatedReservation {
    fn from(reservation: ReservationRecord) -> Self {
        Self {
            reservation,
            message: RESERVATION_CREATED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_accepts_camel_case() {
        let request: CreateReservationRequest = serde_json::from_value(serde_json::json!({
            "fullName": "Luis Quispe",
            "email": "luis@example.com",
            "phoneNumber": "988777666",
            "reservationDate": "2025-02-14",
            "numberOfGuests": 4
        }))
        .unwrap();

        let details = request.into_details().unwrap();
        assert_eq!(details.full_name.as_deref(), Some("Luis Quispe"));
        assert_eq!(details.phone_number, "988777666");
        assert_eq!(details.reservation_date, NaiveDate::from_ymd_opt(2025, 2, 14));
        assert_eq!(details.number_of_guests, Some(4));
    }

    #[test]
    fn create_requires_contact() {
        let request = CreateReservationRequest {
            email: Some("luis@example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            request.into_details(),
            Err(ReservationError::MissingContact)
        ));
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(
            UpdateReservationRequest::default().into_patch(),
            Err(ReservationError::EmptyUpdate)
        ));
    }

    #[test]
    fn update_parses_status() {
        let request = UpdateReservationRequest {
            status: Some("confirmed".to_string()),
            ..Default::default()
        };
        let patch = request.into_patch().unwrap();
        assert_eq!(patch.status, Some(ReservationStatus::Confirmed));

        let request = UpdateReservationRequest {
            status: Some("seated".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            request.into_patch(),
            Err(ReservationError::InvalidStatus(_))
        ));
    }
}
