pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{OrderId, OrderKey, OrderNumber, OrderStatus, PaymentStatus, ReservationCode, ReservationStatus};
pub use error::{Result, StoreError};
pub use memory::InMemoryRecordStore;
pub use model::{
    NewOrder, NewOrderItem, NewReservation, OrderDetails, OrderItemDetails, OrderItemRecord,
    OrderPatch, OrderRecord, OrderStatusView, OrderWithItems, ReservationDetails,
    ReservationPatch, ReservationRecord,
};
pub use postgres::PostgresRecordStore;
pub use query::{OrderPage, OrderQuery, ReservationQuery};
pub use store::{GuardedUpdate, RecordStore, RecordStoreExt, WriteStrategy};
