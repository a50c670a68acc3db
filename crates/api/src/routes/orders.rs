//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use domain::{
    CreateOrderRequest, CreatedOrder, OrderListParams, OrderListing, OrderSummary,
    StatusUpdateRequest,
};
use record_store::{OrderRecord, OrderStatusView, OrderWithItems, RecordStore};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /orders — place an order with optional items.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<CreatedOrder>, ApiError> {
    let Json(request) = payload?;
    let created = state.order_service.create_order(request).await?;
    Ok(Json(created))
}

/// GET /orders — filtered, paginated listing, newest first.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<OrderListParams>, QueryRejection>,
) -> Result<Json<OrderListing>, ApiError> {
    let Query(params) = params?;
    let listing = state.order_service.list_orders(params).await?;
    Ok(Json(listing))
}

/// GET /orders/summary — dashboard statistics.
#[tracing::instrument(skip(state))]
pub async fn summary<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrderSummary>, ApiError> {
    let summary = state.order_service.summary().await?;
    Ok(Json(summary))
}

/// GET /orders/{id} — order with items, by order number or numeric id.
#[tracing::instrument(skip(state))]
pub async fn get<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let order = state.order_service.get_order(&id).await?;
    Ok(Json(order))
}

/// GET /orders/{id}/status — the two status columns only.
#[tracing::instrument(skip(state))]
pub async fn get_status<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusView>, ApiError> {
    let view = state.order_service.get_status(&id).await?;
    Ok(Json(view))
}

/// PUT /orders/{id}/status — update status and/or payment_status.
#[tracing::instrument(skip(state, payload))]
pub async fn update_status<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<OrderRecord>, ApiError> {
    let Json(request) = payload?;
    let updated = state.order_service.update_status(&id, request).await?;
    Ok(Json(updated))
}

/// PUT /orders/{id}/cancel — force the order to `cancelled`.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderRecord>, ApiError> {
    let cancelled = state.order_service.cancel_order(&id).await?;
    Ok(Json(cancelled))
}
