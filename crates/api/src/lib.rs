//! HTTP API server for the restaurant ordering backend.
//!
//! Provides REST endpoints for orders and reservations, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use domain::OrderSettings;
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::RecordStore;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RecordStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{orders, reservations, system};

    let metrics_router = Router::new()
        .route("/metrics", get(system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(system::health))
        .route("/orders", get(orders::list::<S>).post(orders::create::<S>))
        .route("/orders/summary", get(orders::summary::<S>))
        .route("/orders/{id}", get(orders::get::<S>))
        .route(
            "/orders/{id}/status",
            get(orders::get_status::<S>).put(orders::update_status::<S>),
        )
        .route("/orders/{id}/cancel", axum::routing::put(orders::cancel::<S>))
        .route(
            "/reservations",
            get(reservations::list::<S>).post(reservations::create::<S>),
        )
        .route(
            "/reservations/{code}",
            get(reservations::get::<S>).put(reservations::update::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .fallback(system::not_found)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a record store.
pub fn create_default_state<S: RecordStore + Clone + 'static>(
    store: S,
    settings: OrderSettings,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, settings))
}
