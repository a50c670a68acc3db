//! Mapping of caller-supplied order identifiers to row predicates.
//!
//! An identifier is either the store-assigned surrogate id or the business
//! order number. Generated order numbers carry the `PED` prefix and never
//! parse as integers, so a fully numeric identifier is taken as a surrogate
//! id on the write path. A purely numeric order number registered by other
//! means resolves on the read path only.

use common::{OrderId, OrderKey, OrderNumber};
use record_store::{OrderWithItems, RecordStore, RecordStoreExt, Result};

/// Returns the surrogate-id predicate if `id` parses fully as an integer.
pub fn numeric_key(id: &str) -> Option<OrderKey> {
    id.parse::<i64>().ok().map(|n| OrderKey::Id(OrderId::new(n)))
}

/// Predicate used by status updates, cancellation and status reads.
pub fn write_key(id: &str) -> OrderKey {
    numeric_key(id).unwrap_or_else(|| OrderKey::Number(OrderNumber::from(id)))
}

/// Fetches an order for display.
///
/// The order number is tried first, unconditionally. Only when it matches no
/// row and `id` is numeric is the surrogate id tried. Store errors other than
/// a missing row are returned without falling back.
pub async fn find_for_read<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
) -> Result<Option<OrderWithItems>> {
    let by_number = OrderKey::Number(OrderNumber::from(id));
    if let Some(order) = store.find_order_optional(&by_number).await? {
        return Ok(Some(order));
    }

    match numeric_key(id) {
        Some(by_id) => store.find_order_optional(&by_id).await,
        None => Ok(None),
    }
}
