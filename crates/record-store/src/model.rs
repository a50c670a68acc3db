//! Row types persisted by the record store.

use chrono::{DateTime, NaiveDate, Utc};
use common::{OrderId, OrderNumber, OrderStatus, PaymentStatus, ReservationCode, ReservationStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer and checkout fields of an order header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderDetails {
    pub customer_name: Option<String>,
    pub customer_email: String,
    pub customer_phone: String,
    pub payment_method: Option<String>,
    pub subtotal: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub service_fee: Option<Decimal>,
    pub total_amount: Decimal,
    pub pickup_time_estimate: Option<String>,
    pub special_instructions: Option<String>,
}

/// Order header to insert. Keys and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub details: OrderDetails,
}

/// A persisted order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(flatten)]
    pub details: OrderDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Line item fields, including the customization payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderItemDetails {
    pub product_id: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Option<Decimal>,
    pub selected_size: Option<String>,
    pub cooking_point: Option<String>,
    pub special_instructions: Option<String>,
}

/// Line item to insert under an existing order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub details: OrderItemDetails,
}

/// A persisted line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: i64,
    pub order_id: OrderId,
    #[serde(flatten)]
    pub details: OrderItemDetails,
}

/// An order header joined with its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
}

/// Fields written by a status update. `None` leaves the column untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderPatch {
    /// Patch setting only the fulfillment status.
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            payment_status: None,
        }
    }

    /// Returns true if the patch writes nothing.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_status.is_none()
    }
}

/// Projection of an order onto its two status columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusView {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// Guest and booking fields of a reservation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReservationDetails {
    pub full_name: Option<String>,
    pub email: String,
    pub phone_number: String,
    pub reservation_date: Option<NaiveDate>,
    pub reservation_time: Option<String>,
    pub number_of_guests: Option<i32>,
    pub special_requests: Option<String>,
}

/// Reservation to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub reservation_code: ReservationCode,
    pub status: ReservationStatus,
    pub details: ReservationDetails,
}

/// A persisted reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub id: i64,
    pub reservation_code: ReservationCode,
    pub status: ReservationStatus,
    #[serde(flatten)]
    pub details: ReservationDetails,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reservation columns written by an update. `None` leaves the column untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReservationPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub reservation_date: Option<NaiveDate>,
    pub reservation_time: Option<String>,
    pub number_of_guests: Option<i32>,
    pub special_requests: Option<String>,
    pub status: Option<ReservationStatus>,
    pub notes: Option<String>,
}

impl ReservationPatch {
    /// Returns true if the patch writes nothing.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.reservation_date.is_none()
            && self.reservation_time.is_none()
            && self.number_of_guests.is_none()
            && self.special_requests.is_none()
            && self.status.is_none()
            && self.notes.is_none()
    }

    /// Applies the patch to a stored reservation in place.
    pub fn apply_to(&self, record: &mut ReservationRecord) {
        let details = &mut record.details;
        if let Some(ref full_name) = self.full_name {
            details.full_name = Some(full_name.clone());
        }
        if let Some(ref email) = self.email {
            details.email = email.clone();
        }
        if let Some(ref phone_number) = self.phone_number {
            details.phone_number = phone_number.clone();
        }
        if let Some(date) = self.reservation_date {
            details.reservation_date = Some(date);
        }
        if let Some(ref time) = self.reservation_time {
            details.reservation_time = Some(time.clone());
        }
        if let Some(guests) = self.number_of_guests {
            details.number_of_guests = Some(guests);
        }
        if let Some(ref requests) = self.special_requests {
            details.special_requests = Some(requests.clone());
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(ref notes) = self.notes {
            record.notes = Some(notes.clone());
        }
    }
}
