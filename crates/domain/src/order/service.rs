//! Order service providing the order lifecycle operations.

use std::time::Instant;

use common::{OrderKey, OrderNumber, OrderStatus, PaymentStatus};
use record_store::{
    GuardedUpdate, NewOrder, NewOrderItem, OrderItemDetails, OrderPatch, OrderRecord,
    OrderStatusView, OrderWithItems, RecordStore, StoreError, WriteStrategy,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::OrderError;
use super::payload::{
    CreateOrderRequest, CreatedOrder, OrderListParams, OrderListing, StatusUpdateRequest,
};
use super::resolver;
use super::transitions::TransitionPolicy;

/// Tunables of the order service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSettings {
    /// Checking applied to fulfillment status updates.
    pub transitions: TransitionPolicy,
    /// Attempts of the compensating delete after a failed item insert.
    pub compensation_attempts: u32,
    /// Upper bound of the listing page size.
    pub max_page_size: u32,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            transitions: TransitionPolicy::Permissive,
            compensation_attempts: 3,
            max_page_size: 100,
        }
    }
}

/// Per-status order counts. `confirmed` is not part of the breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub pending: u64,
    pub preparing: u64,
    pub ready: u64,
    pub completed: u64,
    pub cancelled: u64,
}

impl StatusBreakdown {
    /// Counts the given statuses.
    pub fn tally(statuses: &[OrderStatus]) -> Self {
        let mut breakdown = Self::default();
        for status in statuses {
            match status {
                OrderStatus::Pending => breakdown.pending += 1,
                OrderStatus::Preparing => breakdown.preparing += 1,
                OrderStatus::Ready => breakdown.ready += 1,
                OrderStatus::Completed => breakdown.completed += 1,
                OrderStatus::Cancelled => breakdown.cancelled += 1,
                OrderStatus::Confirmed => {}
            }
        }
        breakdown
    }
}

/// Dashboard statistics over every order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub total_orders: u64,
    /// Sum of `total_amount` over orders whose payment completed.
    pub revenue: Decimal,
    pub status_breakdown: StatusBreakdown,
}

/// Service for managing orders.
///
/// Wraps a record store and applies identifier resolution, payload
/// validation, the status transition table and write compensation.
pub struct OrderService<S: RecordStore> {
    store: S,
    settings: OrderSettings,
}

impl<S: RecordStore> OrderService<S> {
    /// Creates a new order service with default settings.
    pub fn new(store: S) -> Self {
        Self::with_settings(store, OrderSettings::default())
    }

    /// Creates a new order service with the given settings.
    pub fn with_settings(store: S, settings: OrderSettings) -> Self {
        Self { store, settings }
    }

    /// Returns a reference to the underlying record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &OrderSettings {
        &self.settings
    }

    /// Places an order with its items.
    ///
    /// Stores with transactional writes insert header and items together.
    /// Otherwise the header is written first and deleted again if the items
    /// cannot be inserted.
    #[tracing::instrument(skip_all)]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, DomainError> {
        let (details, items) = request.into_parts()?;
        let order = NewOrder {
            order_number: OrderNumber::generate(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            details,
        };

        let created = match self.store.write_strategy() {
            WriteStrategy::Transactional => {
                self.store.insert_order_with_items(order, items).await?
            }
            WriteStrategy::Compensating => self.insert_with_compensation(order, items).await?,
        };

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %created.order.id,
            order_number = %created.order.order_number,
            items = created.items.len(),
            "order created"
        );

        Ok(created.into())
    }

    async fn insert_with_compensation(
        &self,
        order: NewOrder,
        items: Vec<OrderItemDetails>,
    ) -> Result<OrderWithItems, StoreError> {
        let order = self.store.insert_order(order).await?;
        if items.is_empty() {
            return Ok(OrderWithItems {
                order,
                items: Vec::new(),
            });
        }

        let rows = items
            .into_iter()
            .map(|details| NewOrderItem {
                order_id: order.id,
                details,
            })
            .collect();

        match self.store.insert_order_items(rows).await {
            Ok(items) => Ok(OrderWithItems { order, items }),
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %e,
                    "item insert failed, compensating"
                );
                self.compensate(&order).await;
                Err(e)
            }
        }
    }

    /// Deletes an order header whose items could not be written.
    ///
    /// A crash before this runs leaves the header behind without items.
    async fn compensate(&self, order: &OrderRecord) {
        metrics::counter!("order_compensations_total").increment(1);

        let attempts = self.settings.compensation_attempts.max(1);
        for attempt in 1..=attempts {
            match self.store.delete_order(order.id).await {
                Ok(()) => {
                    tracing::info!(order_id = %order.id, attempt, "order header compensated");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        order_id = %order.id,
                        attempt,
                        error = %e,
                        "compensating delete failed"
                    );
                }
            }
        }

        metrics::counter!("order_compensation_failures_total").increment(1);
        tracing::error!(
            order_id = %order.id,
            order_number = %order.order_number,
            attempts,
            "orphaned order header left without items"
        );
    }

    /// Fetches an order with its items, order number first.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: &str) -> Result<OrderWithItems, DomainError> {
        resolver::find_for_read(&self.store, id)
            .await?
            .ok_or_else(|| DomainError::order_not_found(id))
    }

    /// Reads only the two status columns of an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self, id: &str) -> Result<OrderStatusView, DomainError> {
        let key = resolver::write_key(id);
        self.store
            .find_order_status(&key)
            .await
            .map_err(|e| lookup_error(e, &key))
    }

    /// Writes the supplied status fields of an order.
    ///
    /// Under the strict policy the store checks the current fulfillment
    /// status against the transition table and writes in one atomic step.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: &str,
        request: StatusUpdateRequest,
    ) -> Result<OrderRecord, DomainError> {
        let patch = request.into_patch()?;
        let key = resolver::write_key(id);

        let guard = patch.status.and_then(|next| {
            self.settings
                .transitions
                .allowed_sources(next)
                .map(|sources| (next, sources))
        });

        let updated = match guard {
            Some((next, sources)) => match self
                .store
                .update_order_from(&key, patch, &sources)
                .await
                .map_err(|e| lookup_error(e, &key))?
            {
                GuardedUpdate::Applied(order) => order,
                GuardedUpdate::Rejected { current } => {
                    return Err(OrderError::IllegalTransition {
                        from: current,
                        to: next,
                    }
                    .into());
                }
            },
            None => self
                .store
                .update_order(&key, patch)
                .await
                .map_err(|e| lookup_error(e, &key))?,
        };

        metrics::counter!("order_status_updates_total").increment(1);
        tracing::info!(
            order_id = %updated.id,
            status = %updated.status,
            payment_status = %updated.payment_status,
            "order status updated"
        );

        Ok(updated)
    }

    /// Forces an order to `cancelled`, whatever its current status.
    ///
    /// Idempotent. A missing order surfaces as a store error.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: &str) -> Result<OrderRecord, DomainError> {
        let key = resolver::write_key(id);
        let cancelled = self
            .store
            .update_order(&key, OrderPatch::status(OrderStatus::Cancelled))
            .await?;

        metrics::counter!("order_status_updates_total").increment(1);
        tracing::info!(order_id = %cancelled.id, "order cancelled");

        Ok(cancelled)
    }

    /// Lists one page of orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, params: OrderListParams) -> Result<OrderListing, DomainError> {
        let (query, paging) = params.to_query(self.settings.max_page_size)?;
        let page = self.store.query_orders(query).await?;

        Ok(OrderListing {
            data: page.orders,
            meta: paging.meta(page.total),
        })
    }

    /// Computes order count, status breakdown and completed revenue.
    ///
    /// The three reads run concurrently; any failure aborts the summary.
    /// Aggregation happens here over every row, which bounds how far this
    /// scales.
    #[tracing::instrument(skip(self))]
    pub async fn summary(&self) -> Result<OrderSummary, DomainError> {
        let started = Instant::now();

        let (total_orders, statuses, totals) = tokio::try_join!(
            self.store.count_orders(),
            self.store.order_statuses(),
            self.store.order_totals(PaymentStatus::Completed),
        )?;

        let summary = OrderSummary {
            total_orders,
            revenue: totals.into_iter().sum(),
            status_breakdown: StatusBreakdown::tally(&statuses),
        };

        metrics::histogram!("order_summary_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(summary)
    }
}

fn lookup_error(err: StoreError, key: &OrderKey) -> DomainError {
    if err.is_no_rows() {
        DomainError::order_not_found(key)
    } else {
        err.into()
    }
}
