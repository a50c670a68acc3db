use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use common::{
    OrderId, OrderKey, OrderNumber, OrderStatus, ParseStatusError, PaymentStatus, ReservationCode,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row};

use crate::model::{
    NewOrder, NewOrderItem, NewReservation, OrderDetails, OrderItemDetails, OrderItemRecord,
    OrderPatch, OrderRecord, OrderStatusView, OrderWithItems, ReservationDetails,
    ReservationPatch, ReservationRecord,
};
use crate::{
    OrderPage, OrderQuery, ReservationQuery, Result, StoreError,
    store::{GuardedUpdate, RecordStore, WriteStrategy, validate_items_for_insert},
};

const ORDER_COLUMNS: &str = "id, order_number, status, payment_status, customer_name, \
    customer_email, customer_phone, payment_method, subtotal, tax_amount, service_fee, \
    total_amount, pickup_time_estimate, special_instructions, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, unit_price, \
    subtotal, selected_size, cooking_point, special_instructions";

const RESERVATION_COLUMNS: &str = "id, reservation_code, status, full_name, email, \
    phone_number, reservation_date, reservation_time, number_of_guests, special_requests, \
    notes, created_at, updated_at";

/// PostgreSQL-backed record store implementation.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `url` and wraps it.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<OrderRecord> {
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;

        Ok(OrderRecord {
            id: OrderId::new(row.try_get("id")?),
            order_number: OrderNumber::from(row.try_get::<String, _>("order_number")?),
            status: status.parse().map_err(decode_error)?,
            payment_status: payment_status.parse().map_err(decode_error)?,
            details: OrderDetails {
                customer_name: row.try_get("customer_name")?,
                customer_email: row.try_get("customer_email")?,
                customer_phone: row.try_get("customer_phone")?,
                payment_method: row.try_get("payment_method")?,
                subtotal: row.try_get("subtotal")?,
                tax_amount: row.try_get("tax_amount")?,
                service_fee: row.try_get("service_fee")?,
                total_amount: row.try_get("total_amount")?,
                pickup_time_estimate: row.try_get("pickup_time_estimate")?,
                special_instructions: row.try_get("special_instructions")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItemRecord> {
        Ok(OrderItemRecord {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            details: OrderItemDetails {
                product_id: row.try_get("product_id")?,
                product_name: row.try_get("product_name")?,
                quantity: row.try_get("quantity")?,
                unit_price: row.try_get("unit_price")?,
                subtotal: row.try_get("subtotal")?,
                selected_size: row.try_get("selected_size")?,
                cooking_point: row.try_get("cooking_point")?,
                special_instructions: row.try_get("special_instructions")?,
            },
        })
    }

    fn row_to_reservation(row: &PgRow) -> Result<ReservationRecord> {
        let status: String = row.try_get("status")?;

        Ok(ReservationRecord {
            id: row.try_get("id")?,
            reservation_code: ReservationCode::from(row.try_get::<String, _>("reservation_code")?),
            status: status.parse().map_err(decode_error)?,
            details: ReservationDetails {
                full_name: row.try_get("full_name")?,
                email: row.try_get("email")?,
                phone_number: row.try_get("phone_number")?,
                reservation_date: row.try_get("reservation_date")?,
                reservation_time: row.try_get("reservation_time")?,
                number_of_guests: row.try_get("number_of_guests")?,
                special_requests: row.try_get("special_requests")?,
            },
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn insert_order_row<'e, E: PgExecutor<'e>>(
        executor: E,
        order: NewOrder,
    ) -> Result<OrderRecord> {
        let details = order.details;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (order_number, status, payment_status, customer_name,
                customer_email, customer_phone, payment_method, subtotal, tax_amount,
                service_fee, total_amount, pickup_time_estimate, special_instructions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.order_number.as_str())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(details.customer_name)
        .bind(details.customer_email)
        .bind(details.customer_phone)
        .bind(details.payment_method)
        .bind(details.subtotal)
        .bind(details.tax_amount)
        .bind(details.service_fee)
        .bind(details.total_amount)
        .bind(details.pickup_time_estimate)
        .bind(details.special_instructions)
        .fetch_one(executor)
        .await?;

        Self::row_to_order(&row)
    }

    async fn insert_item_rows<'e, E: PgExecutor<'e>>(
        executor: E,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItemRecord>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price, \
             subtotal, selected_size, cooking_point, special_instructions) ",
        );
        builder.push_values(items, |mut b, item| {
            let details = item.details;
            b.push_bind(item.order_id.as_i64())
                .push_bind(details.product_id)
                .push_bind(details.product_name)
                .push_bind(details.quantity)
                .push_bind(details.unit_price)
                .push_bind(details.subtotal)
                .push_bind(details.selected_size)
                .push_bind(details.cooking_point)
                .push_bind(details.special_instructions);
        });
        builder.push(" RETURNING ");
        builder.push(ITEM_COLUMNS);

        let rows = builder.build().fetch_all(executor).await?;
        rows.iter().map(Self::row_to_item).collect()
    }

    async fn update_order_row<'e, E: PgExecutor<'e>>(
        executor: E,
        key: &OrderKey,
        patch: OrderPatch,
    ) -> Result<OrderRecord> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE orders SET updated_at = now()");
        if let Some(status) = patch.status {
            builder.push(", status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(payment_status) = patch.payment_status {
            builder.push(", payment_status = ");
            builder.push_bind(payment_status.as_str());
        }
        push_order_key(&mut builder, key);
        builder.push(" RETURNING ");
        builder.push(ORDER_COLUMNS);

        let row = builder
            .build()
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| StoreError::NoRows(key.to_string()))?;
        Self::row_to_order(&row)
    }

    async fn items_for(&self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItemRecord>>> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id ASC"
        ))
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<OrderItemRecord>> = HashMap::new();
        for row in &rows {
            let item = Self::row_to_item(row)?;
            grouped
                .entry(item.order_id.as_i64())
                .or_default()
                .push(item);
        }
        Ok(grouped)
    }
}

fn decode_error(err: ParseStatusError) -> StoreError {
    StoreError::Decode(err.to_string())
}

fn push_order_key(builder: &mut QueryBuilder<'_, Postgres>, key: &OrderKey) {
    match key {
        OrderKey::Id(id) => {
            builder.push(" WHERE id = ");
            builder.push_bind(id.as_i64());
        }
        OrderKey::Number(number) => {
            builder.push(" WHERE order_number = ");
            builder.push_bind(number.as_str().to_string());
        }
    }
}

fn push_order_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &OrderQuery) {
    builder.push(" WHERE 1=1");
    if let Some(status) = query.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(payment_status) = query.payment_status {
        builder.push(" AND payment_status = ");
        builder.push_bind(payment_status.as_str());
    }
    if let Some(from) = query.from {
        builder.push(" AND created_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND created_at <= ");
        builder.push_bind(to);
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    fn write_strategy(&self) -> WriteStrategy {
        WriteStrategy::Transactional
    }

    async fn insert_order(&self, order: NewOrder) -> Result<OrderRecord> {
        Self::insert_order_row(&self.pool, order).await
    }

    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItemRecord>> {
        validate_items_for_insert(&items)?;
        Self::insert_item_rows(&self.pool, items).await
    }

    #[tracing::instrument(skip_all, fields(order_number = %order.order_number, items = items.len()))]
    async fn insert_order_with_items(
        &self,
        order: NewOrder,
        items: Vec<OrderItemDetails>,
    ) -> Result<OrderWithItems> {
        let mut tx = self.pool.begin().await?;

        let order = Self::insert_order_row(&mut *tx, order).await?;
        let items = if items.is_empty() {
            Vec::new()
        } else {
            let items = items
                .into_iter()
                .map(|details| NewOrderItem {
                    order_id: order.id,
                    details,
                })
                .collect();
            Self::insert_item_rows(&mut *tx, items).await?
        };

        tx.commit().await?;
        Ok(OrderWithItems { order, items })
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        // order_items rows go with it through ON DELETE CASCADE
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_order(&self, key: &OrderKey) -> Result<OrderWithItems> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_order_key(&mut builder, key);

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NoRows(key.to_string()))?;
        let order = Self::row_to_order(&row)?;

        let items = self
            .items_for(&[order.id.as_i64()])
            .await?
            .remove(&order.id.as_i64())
            .unwrap_or_default();
        Ok(OrderWithItems { order, items })
    }

    async fn find_order_status(&self, key: &OrderKey) -> Result<OrderStatusView> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT status, payment_status FROM orders");
        push_order_key(&mut builder, key);

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NoRows(key.to_string()))?;

        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;
        Ok(OrderStatusView {
            status: status.parse().map_err(decode_error)?,
            payment_status: payment_status.parse().map_err(decode_error)?,
        })
    }

    async fn update_order(&self, key: &OrderKey, patch: OrderPatch) -> Result<OrderRecord> {
        Self::update_order_row(&self.pool, key, patch).await
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_order_from(
        &self,
        key: &OrderKey,
        patch: OrderPatch,
        allowed_from: &[OrderStatus],
    ) -> Result<GuardedUpdate> {
        let mut tx = self.pool.begin().await?;

        // row lock held until commit or rollback
        let mut select: QueryBuilder<Postgres> = QueryBuilder::new("SELECT status FROM orders");
        push_order_key(&mut select, key);
        select.push(" FOR UPDATE");
        let current: String = select
            .build_query_scalar::<String>()
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NoRows(key.to_string()))?;
        let current: OrderStatus = current.parse().map_err(decode_error)?;

        if !allowed_from.contains(&current) {
            tx.rollback().await?;
            return Ok(GuardedUpdate::Rejected { current });
        }

        let order = Self::update_order_row(&mut *tx, key, patch).await?;
        tx.commit().await?;
        Ok(GuardedUpdate::Applied(order))
    }

    #[tracing::instrument(skip(self))]
    async fn query_orders(&self, query: OrderQuery) -> Result<OrderPage> {
        let started = Instant::now();

        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        push_order_filters(&mut count, &query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_order_filters(&mut select, &query);
        select.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = query.limit {
            select.push(" LIMIT ");
            select.push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            select.push(" OFFSET ");
            select.push_bind(offset as i64);
        }

        let rows = select.build().fetch_all(&self.pool).await?;
        let headers = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<i64> = headers.iter().map(|o| o.id.as_i64()).collect();
        let mut items = self.items_for(&ids).await?;
        let orders = headers
            .into_iter()
            .map(|order| {
                let items = items.remove(&order.id.as_i64()).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect();

        metrics::histogram!("record_store_query_seconds", "operation" => "query_orders")
            .record(started.elapsed().as_secs_f64());

        Ok(OrderPage {
            orders,
            total: total as u64,
        })
    }

    async fn count_orders(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(total as u64)
    }

    async fn order_statuses(&self) -> Result<Vec<OrderStatus>> {
        let statuses: Vec<String> = sqlx::query_scalar("SELECT status FROM orders")
            .fetch_all(&self.pool)
            .await?;
        statuses
            .iter()
            .map(|s| s.parse().map_err(decode_error))
            .collect()
    }

    async fn order_totals(&self, payment_status: PaymentStatus) -> Result<Vec<Decimal>> {
        let totals: Vec<Decimal> = sqlx::query_scalar("SELECT total_amount FROM orders WHERE payment_status = $1")
            .bind(payment_status.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(totals)
    }

    async fn insert_reservation(&self, reservation: NewReservation) -> Result<ReservationRecord> {
        let details = reservation.details;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO reservations (reservation_code, status, full_name, email, phone_number,
                reservation_date, reservation_time, number_of_guests, special_requests)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(reservation.reservation_code.as_str())
        .bind(reservation.status.as_str())
        .bind(details.full_name)
        .bind(details.email)
        .bind(details.phone_number)
        .bind(details.reservation_date)
        .bind(details.reservation_time)
        .bind(details.number_of_guests)
        .bind(details.special_requests)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_reservation(&row)
    }

    async fn find_reservation(&self, code: &ReservationCode) -> Result<ReservationRecord> {
        let row = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE reservation_code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NoRows(format!("reservation_code={code}")))?;

        Self::row_to_reservation(&row)
    }

    async fn update_reservation(
        &self,
        code: &ReservationCode,
        patch: ReservationPatch,
    ) -> Result<ReservationRecord> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE reservations SET updated_at = now()");
        if let Some(full_name) = patch.full_name {
            builder.push(", full_name = ");
            builder.push_bind(full_name);
        }
        if let Some(email) = patch.email {
            builder.push(", email = ");
            builder.push_bind(email);
        }
        if let Some(phone_number) = patch.phone_number {
            builder.push(", phone_number = ");
            builder.push_bind(phone_number);
        }
        if let Some(date) = patch.reservation_date {
            builder.push(", reservation_date = ");
            builder.push_bind(date);
        }
        if let Some(time) = patch.reservation_time {
            builder.push(", reservation_time = ");
            builder.push_bind(time);
        }
        if let Some(guests) = patch.number_of_guests {
            builder.push(", number_of_guests = ");
            builder.push_bind(guests);
        }
        if let Some(requests) = patch.special_requests {
            builder.push(", special_requests = ");
            builder.push_bind(requests);
        }
        if let Some(status) = patch.status {
            builder.push(", status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(notes) = patch.notes {
            builder.push(", notes = ");
            builder.push_bind(notes);
        }
        builder.push(" WHERE reservation_code = ");
        builder.push_bind(code.as_str().to_string());
        builder.push(" RETURNING ");
        builder.push(RESERVATION_COLUMNS);

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NoRows(format!("reservation_code={code}")))?;
        Self::row_to_reservation(&row)
    }

    async fn list_reservations(&self, query: ReservationQuery) -> Result<Vec<ReservationRecord>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {RESERVATION_COLUMNS} FROM reservations"));
        if let Some(email) = query.email {
            builder.push(" WHERE email = ");
            builder.push_bind(email);
        }
        builder.push(" ORDER BY reservation_date DESC NULLS LAST, id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_reservation).collect()
    }
}
