use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderKey, OrderStatus, PaymentStatus, ReservationCode};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::model::{
    NewOrder, NewOrderItem, NewReservation, OrderItemDetails, OrderItemRecord, OrderPatch,
    OrderRecord, OrderStatusView, OrderWithItems, ReservationPatch, ReservationRecord,
};
use crate::{
    OrderPage, OrderQuery, ReservationQuery, Result, StoreError,
    store::{GuardedUpdate, RecordStore, WriteStrategy, validate_items_for_insert},
};

#[derive(Debug, Default)]
struct Tables {
    orders: BTreeMap<i64, OrderRecord>,
    items: Vec<OrderItemRecord>,
    reservations: Vec<ReservationRecord>,
    next_order_id: i64,
    next_item_id: i64,
    next_reservation_id: i64,
}

impl Tables {
    fn find_order_id(&self, key: &OrderKey) -> Option<i64> {
        match key {
            OrderKey::Id(id) => self
                .orders
                .contains_key(&id.as_i64())
                .then_some(id.as_i64()),
            OrderKey::Number(number) => self
                .orders
                .values()
                .find(|o| &o.order_number == number)
                .map(|o| o.id.as_i64()),
        }
    }

    fn items_of(&self, order_id: OrderId) -> Vec<OrderItemRecord> {
        self.items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    fn push_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        if self
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::UniqueViolation(
                "orders_order_number_key".to_string(),
            ));
        }

        self.next_order_id += 1;
        let now = Utc::now();
        let record = OrderRecord {
            id: OrderId::new(self.next_order_id),
            order_number: order.order_number,
            status: order.status,
            payment_status: order.payment_status,
            details: order.details,
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(record.id.as_i64(), record.clone());
        Ok(record)
    }

    fn push_items(&mut self, items: Vec<NewOrderItem>) -> Vec<OrderItemRecord> {
        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            self.next_item_id += 1;
            let record = OrderItemRecord {
                id: self.next_item_id,
                order_id: item.order_id,
                details: item.details,
            };
            self.items.push(record.clone());
            stored.push(record);
        }
        stored
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_order_insert: AtomicBool,
    fail_on_item_insert: AtomicBool,
    failing_deletes: AtomicU32,
    fail_on_read: AtomicBool,
    writes: AtomicU64,
    deletes: AtomicU64,
}

/// In-memory record store implementation for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation, plus
/// switches that make individual operations fail so error paths can be
/// exercised.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
    transactional: bool,
}

impl InMemoryRecordStore {
    /// Creates a new empty store that needs compensating writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store that writes order aggregates atomically.
    pub fn transactional() -> Self {
        Self {
            transactional: true,
            ..Self::default()
        }
    }

    /// Makes every order header insert fail while set.
    pub fn set_fail_on_order_insert(&self, fail: bool) {
        self.faults
            .fail_on_order_insert
            .store(fail, Ordering::SeqCst);
    }

    /// Makes every item insert fail while set.
    pub fn set_fail_on_item_insert(&self, fail: bool) {
        self.faults.fail_on_item_insert.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` deletes fail.
    pub fn fail_next_deletes(&self, count: u32) {
        self.faults.failing_deletes.store(count, Ordering::SeqCst);
    }

    /// Makes every read fail while set.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.faults.fail_on_read.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of write operations attempted so far.
    pub fn write_count(&self) -> u64 {
        self.faults.writes.load(Ordering::SeqCst)
    }

    /// Returns the number of order deletes attempted so far.
    pub fn delete_count(&self) -> u64 {
        self.faults.deletes.load(Ordering::SeqCst)
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of stored order items.
    pub async fn item_count(&self) -> usize {
        self.tables.read().await.items.len()
    }

    /// Overrides the creation timestamp of a stored order.
    pub async fn backdate_order(&self, id: OrderId, created_at: DateTime<Utc>) {
        if let Some(order) = self.tables.write().await.orders.get_mut(&id.as_i64()) {
            order.created_at = created_at;
        }
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }

    fn record_write(&self) {
        self.faults.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn check_order_insert(&self) -> Result<()> {
        if self.faults.fail_on_order_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order insert rejected".to_string()));
        }
        Ok(())
    }

    fn check_item_insert(&self) -> Result<()> {
        if self.faults.fail_on_item_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("item insert rejected".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.faults.fail_on_read.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read rejected".to_string()));
        }
        Ok(())
    }
}

fn apply_patch(order: &mut OrderRecord, patch: OrderPatch) {
    if let Some(status) = patch.status {
        order.status = status;
    }
    if let Some(payment_status) = patch.payment_status {
        order.payment_status = payment_status;
    }
    order.updated_at = Utc::now();
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn write_strategy(&self) -> WriteStrategy {
        if self.transactional {
            WriteStrategy::Transactional
        } else {
            WriteStrategy::Compensating
        }
    }

    async fn insert_order(&self, order: NewOrder) -> Result<OrderRecord> {
        self.record_write();
        self.check_order_insert()?;
        self.tables.write().await.push_order(order)
    }

    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItemRecord>> {
        self.record_write();
        let order_id = validate_items_for_insert(&items)?;
        self.check_item_insert()?;

        let mut tables = self.tables.write().await;
        if !tables.orders.contains_key(&order_id.as_i64()) {
            return Err(StoreError::InvalidWrite(format!(
                "order {order_id} does not exist"
            )));
        }
        Ok(tables.push_items(items))
    }

    async fn insert_order_with_items(
        &self,
        order: NewOrder,
        items: Vec<OrderItemDetails>,
    ) -> Result<OrderWithItems> {
        if !self.transactional {
            return Err(StoreError::Unsupported("multi-statement transactions"));
        }
        self.record_write();
        self.check_order_insert()?;
        if !items.is_empty() {
            self.check_item_insert()?;
        }

        // Holding the write lock across both inserts stands in for a transaction.
        let mut tables = self.tables.write().await;
        let order = tables.push_order(order)?;
        let items = items
            .into_iter()
            .map(|details| NewOrderItem {
                order_id: order.id,
                details,
            })
            .collect();
        let items = tables.push_items(items);
        Ok(OrderWithItems { order, items })
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        self.record_write();
        self.faults.deletes.fetch_add(1, Ordering::SeqCst);

        if self
            .faults
            .failing_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable("delete rejected".to_string()));
        }

        let mut tables = self.tables.write().await;
        tables.orders.remove(&id.as_i64());
        tables.items.retain(|item| item.order_id != id);
        Ok(())
    }

    async fn find_order(&self, key: &OrderKey) -> Result<OrderWithItems> {
        self.check_read()?;
        let tables = self.tables.read().await;
        let id = tables
            .find_order_id(key)
            .ok_or_else(|| StoreError::NoRows(key.to_string()))?;
        let order = tables.orders[&id].clone();
        let items = tables.items_of(order.id);
        Ok(OrderWithItems { order, items })
    }

    async fn find_order_status(&self, key: &OrderKey) -> Result<OrderStatusView> {
        self.check_read()?;
        let tables = self.tables.read().await;
        let id = tables
            .find_order_id(key)
            .ok_or_else(|| StoreError::NoRows(key.to_string()))?;
        let order = &tables.orders[&id];
        Ok(OrderStatusView {
            status: order.status,
            payment_status: order.payment_status,
        })
    }

    async fn update_order(&self, key: &OrderKey, patch: OrderPatch) -> Result<OrderRecord> {
        self.record_write();
        let mut tables = self.tables.write().await;
        let id = tables
            .find_order_id(key)
            .ok_or_else(|| StoreError::NoRows(key.to_string()))?;

        let Some(order) = tables.orders.get_mut(&id) else {
            return Err(StoreError::NoRows(key.to_string()));
        };
        apply_patch(order, patch);
        Ok(order.clone())
    }

    async fn update_order_from(
        &self,
        key: &OrderKey,
        patch: OrderPatch,
        allowed_from: &[OrderStatus],
    ) -> Result<GuardedUpdate> {
        self.record_write();
        // the write lock is held across the check and the write
        let mut tables = self.tables.write().await;
        let id = tables
            .find_order_id(key)
            .ok_or_else(|| StoreError::NoRows(key.to_string()))?;

        let Some(order) = tables.orders.get_mut(&id) else {
            return Err(StoreError::NoRows(key.to_string()));
        };
        if !allowed_from.contains(&order.status) {
            return Ok(GuardedUpdate::Rejected {
                current: order.status,
            });
        }
        apply_patch(order, patch);
        Ok(GuardedUpdate::Applied(order.clone()))
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<OrderPage> {
        self.check_read()?;
        let tables = self.tables.read().await;

        let mut matching: Vec<&OrderRecord> = tables
            .orders
            .values()
            .filter(|o| query.matches(o.status, o.payment_status, o.created_at))
            .collect();

        // Newest first, surrogate key breaks ties
        matching.sort_by_key(|o| Reverse((o.created_at, o.id)));

        let total = matching.len() as u64;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        let orders = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|order| OrderWithItems {
                order: order.clone(),
                items: tables.items_of(order.id),
            })
            .collect();

        Ok(OrderPage { orders, total })
    }

    async fn count_orders(&self) -> Result<u64> {
        self.check_read()?;
        Ok(self.tables.read().await.orders.len() as u64)
    }

    async fn order_statuses(&self) -> Result<Vec<OrderStatus>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        Ok(tables.orders.values().map(|o| o.status).collect())
    }

    async fn order_totals(&self, payment_status: PaymentStatus) -> Result<Vec<Decimal>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.payment_status == payment_status)
            .map(|o| o.details.total_amount)
            .collect())
    }

    async fn insert_reservation(&self, reservation: NewReservation) -> Result<ReservationRecord> {
        self.record_write();
        let mut tables = self.tables.write().await;

        if tables
            .reservations
            .iter()
            .any(|r| r.reservation_code == reservation.reservation_code)
        {
            return Err(StoreError::UniqueViolation(
                "reservations_reservation_code_key".to_string(),
            ));
        }

        tables.next_reservation_id += 1;
        let now = Utc::now();
        let record = ReservationRecord {
            id: tables.next_reservation_id,
            reservation_code: reservation.reservation_code,
            status: reservation.status,
            details: reservation.details,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        tables.reservations.push(record.clone());
        Ok(record)
    }

    async fn find_reservation(&self, code: &ReservationCode) -> Result<ReservationRecord> {
        self.check_read()?;
        let tables = self.tables.read().await;
        tables
            .reservations
            .iter()
            .find(|r| &r.reservation_code == code)
            .cloned()
            .ok_or_else(|| StoreError::NoRows(format!("reservation_code={code}")))
    }

    async fn update_reservation(
        &self,
        code: &ReservationCode,
        patch: ReservationPatch,
    ) -> Result<ReservationRecord> {
        self.record_write();
        let mut tables = self.tables.write().await;
        let reservation = tables
            .reservations
            .iter_mut()
            .find(|r| &r.reservation_code == code)
            .ok_or_else(|| StoreError::NoRows(format!("reservation_code={code}")))?;

        patch.apply_to(reservation);
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    async fn list_reservations(&self, query: ReservationQuery) -> Result<Vec<ReservationRecord>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        let mut reservations: Vec<_> = tables
            .reservations
            .iter()
            .filter(|r| {
                query
                    .email
                    .as_ref()
                    .is_none_or(|email| &r.details.email == email)
            })
            .cloned()
            .collect();

        // Newest date first, undated last
        reservations.sort_by_key(|r| {
            (
                r.details.reservation_date.is_none(),
                Reverse(r.details.reservation_date),
                Reverse(r.id),
            )
        });
        Ok(reservations)
    }
}
