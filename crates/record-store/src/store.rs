use async_trait::async_trait;
use common::{OrderId, OrderKey, OrderStatus, PaymentStatus, ReservationCode};
use rust_decimal::Decimal;

use crate::model::{
    NewOrder, NewOrderItem, NewReservation, OrderItemDetails, OrderItemRecord, OrderPatch,
    OrderRecord, OrderStatusView, OrderWithItems, ReservationPatch, ReservationRecord,
};
use crate::{OrderPage, OrderQuery, ReservationQuery, Result, StoreError};

/// How a store writes an order header together with its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Header and items are written in one transaction through
    /// [`RecordStore::insert_order_with_items`].
    Transactional,
    /// Header and items are separate writes; a failed item insert must be
    /// compensated by deleting the header.
    Compensating,
}

/// Outcome of [`RecordStore::update_order_from`].
#[derive(Debug, Clone, PartialEq)]
pub enum GuardedUpdate {
    /// The order held an allowed status and the patch was written.
    Applied(OrderRecord),
    /// The order's status was outside the allowed set. Nothing was written.
    Rejected { current: OrderStatus },
}

/// Core trait for record store implementations.
///
/// Single-row operations fail with [`StoreError::NoRows`] when nothing
/// matches. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reports how order aggregates must be written against this store.
    fn write_strategy(&self) -> WriteStrategy {
        WriteStrategy::Compensating
    }

    /// Inserts an order header and returns the stored row.
    async fn insert_order(&self, order: NewOrder) -> Result<OrderRecord>;

    /// Bulk-inserts line items. Either all rows are written or none are.
    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItemRecord>>;

    /// Inserts a header and its items in one transaction.
    ///
    /// Only stores reporting [`WriteStrategy::Transactional`] implement this.
    async fn insert_order_with_items(
        &self,
        _order: NewOrder,
        _items: Vec<OrderItemDetails>,
    ) -> Result<OrderWithItems> {
        Err(StoreError::Unsupported("multi-statement transactions"))
    }

    /// Deletes an order and its items. Deleting a missing order succeeds.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    /// Fetches one order joined with its items.
    async fn find_order(&self, key: &OrderKey) -> Result<OrderWithItems>;

    /// Fetches only the two status columns of one order.
    async fn find_order_status(&self, key: &OrderKey) -> Result<OrderStatusView>;

    /// Writes the supplied status columns of one order and returns the row.
    async fn update_order(&self, key: &OrderKey, patch: OrderPatch) -> Result<OrderRecord>;

    /// Writes the patch only if the order's current fulfillment status is one
    /// of `allowed_from`.
    ///
    /// The status check and the write are atomic with respect to concurrent
    /// updates of the same order.
    async fn update_order_from(
        &self,
        key: &OrderKey,
        patch: OrderPatch,
        allowed_from: &[OrderStatus],
    ) -> Result<GuardedUpdate>;

    /// Lists one page of orders matching the query, with the total count.
    async fn query_orders(&self, query: OrderQuery) -> Result<OrderPage>;

    /// Counts all orders.
    async fn count_orders(&self) -> Result<u64>;

    /// Returns the fulfillment status of every order.
    async fn order_statuses(&self) -> Result<Vec<OrderStatus>>;

    /// Returns `total_amount` of every order with the given payment status.
    async fn order_totals(&self, payment_status: PaymentStatus) -> Result<Vec<Decimal>>;

    /// Inserts a reservation and returns the stored row.
    async fn insert_reservation(&self, reservation: NewReservation) -> Result<ReservationRecord>;

    /// Fetches one reservation by its business code.
    async fn find_reservation(&self, code: &ReservationCode) -> Result<ReservationRecord>;

    /// Writes the supplied columns of one reservation and returns the row.
    async fn update_reservation(
        &self,
        code: &ReservationCode,
        patch: ReservationPatch,
    ) -> Result<ReservationRecord>;

    /// Lists reservations, newest reservation date first.
    async fn list_reservations(&self, query: ReservationQuery) -> Result<Vec<ReservationRecord>>;
}

/// Extension trait providing convenience methods for record stores.
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Like [`RecordStore::find_order`], mapping `NoRows` to `None`.
    async fn find_order_optional(&self, key: &OrderKey) -> Result<Option<OrderWithItems>> {
        match self.find_order(key).await {
            Ok(order) => Ok(Some(order)),
            Err(e) if e.is_no_rows() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Like [`RecordStore::find_reservation`], mapping `NoRows` to `None`.
    async fn find_reservation_optional(
        &self,
        code: &ReservationCode,
    ) -> Result<Option<ReservationRecord>> {
        match self.find_reservation(code).await {
            Ok(reservation) => Ok(Some(reservation)),
            Err(e) if e.is_no_rows() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Checks if an order matching the key exists.
    async fn order_exists(&self, key: &OrderKey) -> Result<bool> {
        Ok(self.find_order_optional(key).await?.is_some())
    }
}

// Blanket implementation for all RecordStore implementations
impl<T: RecordStore + ?Sized> RecordStoreExt for T {}

/// Validates line items before a bulk insert.
pub fn validate_items_for_insert(items: &[NewOrderItem]) -> Result<OrderId> {
    let Some(first) = items.first() else {
        return Err(StoreError::InvalidWrite(
            "Cannot insert empty item list".to_string(),
        ));
    };

    // All items must belong to the same order
    if items.iter().any(|item| item.order_id != first.order_id) {
        return Err(StoreError::InvalidWrite(
            "All items must belong to the same order".to_string(),
        ));
    }

    Ok(first.order_id)
}
