//! Reservation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use domain::{CreateReservationRequest, CreatedReservation, UpdateReservationRequest};
use record_store::{RecordStore, ReservationRecord};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub email: Option<String>,
}

/// GET /reservations — all reservations, optionally for one email.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ReservationRecord>>, ApiError> {
    let Query(params) = params?;
    let reservations = state.reservation_service.list(params.email).await?;
    Ok(Json(reservations))
}

/// POST /reservations — book a table.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<Json<CreatedReservation>, ApiError> {
    let Json(request) = payload?;
    let created = state.reservation_service.create(request).await?;
    Ok(Json(created))
}

/// GET /reservations/{code}
#[tracing::instrument(skip(state))]
pub async fn get<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Result<Json<ReservationRecord>, ApiError> {
    let reservation = state.reservation_service.get(&code).await?;
    Ok(Json(reservation))
}

/// PUT /reservations/{code}
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: RecordStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
    payload: Result<Json<UpdateReservationRequest>, JsonRejection>,
) -> Result<Json<ReservationRecord>, ApiError> {
    let Json(request) = payload?;
    let updated = state.reservation_service.update(&code, request).await?;
    Ok(Json(updated))
}
