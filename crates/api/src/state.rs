//! Shared application state.

use domain::{OrderService, OrderSettings, ReservationService};
use record_store::RecordStore;

/// Shared application state accessible from all handlers.
///
/// Built once at startup; each service holds its own handle to the store.
pub struct AppState<S: RecordStore> {
    pub order_service: OrderService<S>,
    pub reservation_service: ReservationService<S>,
}

impl<S: RecordStore + Clone> AppState<S> {
    pub fn new(store: S, settings: OrderSettings) -> Self {
        Self {
            order_service: OrderService::with_settings(store.clone(), settings),
            reservation_service: ReservationService::new(store),
        }
    }
}
