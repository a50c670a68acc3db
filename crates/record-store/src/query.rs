use chrono::{DateTime, Utc};
use common::{OrderStatus, PaymentStatus};

use crate::model::OrderWithItems;

/// Builder for filtered, paginated order listings.
///
/// Results are always sorted by creation time, newest first, with the
/// surrogate key breaking ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Filter by fulfillment status (exact match).
    pub status: Option<OrderStatus>,

    /// Filter by payment status (exact match).
    pub payment_status: Option<PaymentStatus>,

    /// Filter by orders created at or after this timestamp.
    pub from: Option<DateTime<Utc>>,

    /// Filter by orders created at or before this timestamp.
    pub to: Option<DateTime<Utc>>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by fulfillment status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by payment status.
    pub fn payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    /// Filters to orders created at or after this timestamp.
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Filters to orders created at or before this timestamp.
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Limits the number of orders returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many orders before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if a row with these attributes passes every filter.
    pub fn matches(
        &self,
        status: OrderStatus,
        payment_status: PaymentStatus,
        created_at: DateTime<Utc>,
    ) -> bool {
        if let Some(wanted) = self.status
            && status != wanted
        {
            return false;
        }
        if let Some(wanted) = self.payment_status
            && payment_status != wanted
        {
            return false;
        }
        if let Some(from) = self.from
            && created_at < from
        {
            return false;
        }
        if let Some(to) = self.to
            && created_at > to
        {
            return false;
        }
        true
    }
}

/// One page of orders plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPage {
    pub orders: Vec<OrderWithItems>,
    /// Matching rows ignoring limit and offset.
    pub total: u64,
}

/// Filters for reservation listings, newest reservation date first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationQuery {
    /// Filter by guest email (exact match).
    pub email: Option<String>,
}

impl ReservationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn query_builder_chain() {
        let now = Utc::now();
        let query = OrderQuery::new()
            .status(OrderStatus::Ready)
            .payment_status(PaymentStatus::Completed)
            .from(now)
            .to(now)
            .limit(20)
            .offset(20);

        assert_eq!(query.status, Some(OrderStatus::Ready));
        assert_eq!(query.payment_status, Some(PaymentStatus::Completed));
        assert_eq!(query.from, Some(now));
        assert_eq!(query.to, Some(now));
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(20));
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = OrderQuery::new();
        assert!(query.matches(OrderStatus::Cancelled, PaymentStatus::Failed, Utc::now()));
    }

    #[test]
    fn time_bounds_are_inclusive() {
        let now = Utc::now();
        let query = OrderQuery::new().from(now).to(now);

        assert!(query.matches(OrderStatus::Pending, PaymentStatus::Pending, now));
        assert!(!query.matches(
            OrderStatus::Pending,
            PaymentStatus::Pending,
            now - Duration::seconds(1)
        ));
        assert!(!query.matches(
            OrderStatus::Pending,
            PaymentStatus::Pending,
            now + Duration::seconds(1)
        ));
    }

    #[test]
    fn status_filters_are_exact() {
        let query = OrderQuery::new()
            .status(OrderStatus::Pending)
            .payment_status(PaymentStatus::Completed);

        assert!(query.matches(OrderStatus::Pending, PaymentStatus::Completed, Utc::now()));
        assert!(!query.matches(OrderStatus::Confirmed, PaymentStatus::Completed, Utc::now()));
        assert!(!query.matches(OrderStatus::Pending, PaymentStatus::Pending, Utc::now()));
    }

    #[test]
    fn reservation_query_email() {
        let query = ReservationQuery::new().email("ana@example.com");
        assert_eq!(query.email.as_deref(), Some("ana@example.com"));
    }
}
