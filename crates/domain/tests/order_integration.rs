//! Integration tests for the order lifecycle.
//!
//! These tests drive `OrderService` against the in-memory record store,
//! including its fault injection for the compensating write path.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{OrderId, OrderStatus, PaymentStatus};
use domain::{
    CreateOrderRequest, DomainError, OrderError, OrderItemRequest, OrderListParams, OrderService,
    OrderSettings, StatusUpdateRequest, TransitionPolicy,
};
use record_store::{InMemoryRecordStore, StoreError};
use rust_decimal::Decimal;

/// Helper to create a test order service
fn create_service() -> OrderService<InMemoryRecordStore> {
    OrderService::new(InMemoryRecordStore::new())
}

fn checkout(items: usize) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: Some("Ana Torres".to_string()),
        customer_email: Some("ana@example.com".to_string()),
        customer_phone: Some("999111222".to_string()),
        total_amount: Some(Decimal::new(4590, 2)),
        items: Some(
            (0..items)
                .map(|n| OrderItemRequest {
                    product_id: format!("dish-{n}"),
                    quantity: 1,
                    unit_price: Decimal::new(1530, 2),
                    ..Default::default()
                })
                .collect(),
        ),
        ..Default::default()
    }
}

fn set_status(status: &str) -> StatusUpdateRequest {
    StatusUpdateRequest {
        status: Some(status.to_string()),
        payment_status: None,
    }
}

fn set_payment(payment_status: &str) -> StatusUpdateRequest {
    StatusUpdateRequest {
        status: None,
        payment_status: Some(payment_status.to_string()),
    }
}

mod create_order {
    use super::*;

    #[tokio::test]
    async fn creates_pending_order_with_items() {
        let service = create_service();

        let created = service.create_order(checkout(2)).await.unwrap();

        assert_eq!(created.order.status, OrderStatus::Pending);
        assert_eq!(created.order.payment_status, PaymentStatus::Pending);
        assert_eq!(created.items.len(), 2);
        assert!(created.items.iter().all(|i| i.order_id == created.order.id));
        assert_eq!(created.message, "Order created successfully");

        let today = Utc::now().format("%Y%m%d").to_string();
        let number = created.order.order_number.as_str();
        assert!(number.starts_with(&format!("PED{today}")));
        let suffix: u16 = number[11..].parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
    }

    #[tokio::test]
    async fn order_without_items_is_legal() {
        let service = create_service();

        let created = service.create_order(checkout(0)).await.unwrap();

        assert!(created.items.is_empty());
        assert_eq!(service.store().order_count().await, 1);
    }

    #[tokio::test]
    async fn missing_contact_writes_nothing() {
        let service = create_service();
        let mut request = checkout(1);
        request.customer_email = None;

        let err = service.create_order(request).await.unwrap_err();

        assert!(matches!(err, DomainError::Order(OrderError::MissingContact)));
        assert!(err.is_validation());
        assert_eq!(service.store().write_count(), 0);
    }

    #[tokio::test]
    async fn failed_header_insert_writes_no_items() {
        let service = create_service();
        service.store().set_fail_on_order_insert(true);

        let err = service.create_order(checkout(1)).await.unwrap_err();

        assert!(matches!(err, DomainError::Store(_)));
        assert_eq!(service.store().item_count().await, 0);
        assert_eq!(service.store().delete_count(), 0);
    }
}

mod compensation {
    use super::*;

    #[tokio::test]
    async fn failed_item_insert_deletes_header() {
        let service = create_service();
        service.store().set_fail_on_item_insert(true);

        let err = service.create_order(checkout(2)).await.unwrap_err();

        assert!(matches!(err, DomainError::Store(_)));
        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(service.store().item_count().await, 0);
        assert_eq!(service.store().delete_count(), 1);
    }

    #[tokio::test]
    async fn transient_delete_failure_is_retried() {
        let service = create_service();
        service.store().set_fail_on_item_insert(true);
        service.store().fail_next_deletes(2);

        service.create_order(checkout(1)).await.unwrap_err();

        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(service.store().delete_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_leave_orphan_and_surface_item_error() {
        let store = InMemoryRecordStore::new();
        let service = OrderService::with_settings(
            store,
            OrderSettings {
                compensation_attempts: 2,
                ..Default::default()
            },
        );
        service.store().set_fail_on_item_insert(true);
        service.store().fail_next_deletes(5);

        let err = service.create_order(checkout(1)).await.unwrap_err();

        // the item insert error, not the delete error
        assert!(matches!(
            err,
            DomainError::Store(StoreError::Unavailable(ref msg)) if msg == "item insert rejected"
        ));
        assert_eq!(service.store().delete_count(), 2);
        assert_eq!(service.store().order_count().await, 1);
    }

    #[tokio::test]
    async fn transactional_store_needs_no_compensation() {
        let service = OrderService::new(InMemoryRecordStore::transactional());
        service.store().set_fail_on_item_insert(true);

        service.create_order(checkout(2)).await.unwrap_err();

        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(service.store().delete_count(), 0);
    }
}

mod lookup {
    use super::*;

    #[tokio::test]
    async fn get_by_order_number_and_by_id() {
        let service = create_service();
        let created = service.create_order(checkout(1)).await.unwrap();

        let by_number = service
            .get_order(created.order.order_number.as_str())
            .await
            .unwrap();
        let by_id = service
            .get_order(&created.order.id.to_string())
            .await
            .unwrap();

        assert_eq!(by_number, by_id);
        assert_eq!(by_id.items.len(), 1);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let service = create_service();

        let err = service.get_order("PED202501011234").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        let err = service.get_order("77").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn status_view() {
        let service = create_service();
        let created = service.create_order(checkout(0)).await.unwrap();

        let view = service
            .get_status(created.order.order_number.as_str())
            .await
            .unwrap();
        assert_eq!(view.status, OrderStatus::Pending);
        assert_eq!(view.payment_status, PaymentStatus::Pending);

        let err = service.get_status("404").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn store_errors_are_not_not_found() {
        let service = create_service();
        service.store().set_fail_on_read(true);

        let err = service.get_status("1").await.unwrap_err();
        assert!(matches!(err, DomainError::Store(_)));
    }
}

mod status_updates {
    use super::*;

    #[tokio::test]
    async fn forward_moves_through_lifecycle() {
        let service = create_service();
        let id = service.create_order(checkout(1)).await.unwrap().order.id;
        let id = id.to_string();

        for status in ["confirmed", "preparing", "ready", "completed"] {
            let updated = service.update_status(&id, set_status(status)).await.unwrap();
            assert_eq!(updated.status.as_str(), status);
        }
    }

    #[tokio::test]
    async fn payment_only_update_keeps_status() {
        let service = create_service();
        let number = service
            .create_order(checkout(1))
            .await
            .unwrap()
            .order
            .order_number;
        service
            .update_status(number.as_str(), set_status("preparing"))
            .await
            .unwrap();

        let updated = service
            .update_status(number.as_str(), set_payment("completed"))
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Preparing);
        assert_eq!(updated.payment_status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn status_only_update_keeps_payment() {
        let service = create_service();
        let id = service.create_order(checkout(1)).await.unwrap().order.id;
        service
            .update_status(&id.to_string(), set_payment("failed"))
            .await
            .unwrap();

        let updated = service
            .update_status(&id.to_string(), set_status("confirmed"))
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Confirmed);
        assert_eq!(updated.payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn value_outside_domain_leaves_status_unchanged() {
        let service = create_service();
        let id = service.create_order(checkout(1)).await.unwrap().order.id;

        let err = service
            .update_status(&id.to_string(), set_status("archived"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Order(OrderError::InvalidStatus(_))));
        assert!(err.to_string().contains("Valid values"));
        let view = service.get_status(&id.to_string()).await.unwrap();
        assert_eq!(view.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let service = create_service();
        let id = service.create_order(checkout(1)).await.unwrap().order.id;

        let err = service
            .update_status(&id.to_string(), StatusUpdateRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Order(OrderError::EmptyStatusUpdate)));
    }

    fn strict_service() -> OrderService<InMemoryRecordStore> {
        OrderService::with_settings(
            InMemoryRecordStore::new(),
            OrderSettings {
                transitions: TransitionPolicy::Strict,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn strict_policy_rejects_backward_move() {
        let service = strict_service();
        let id = service.create_order(checkout(1)).await.unwrap().order.id;
        service
            .update_status(&id.to_string(), set_status("ready"))
            .await
            .unwrap();

        let err = service
            .update_status(&id.to_string(), set_status("pending"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Order(OrderError::IllegalTransition {
                from: OrderStatus::Ready,
                to: OrderStatus::Pending
            })
        ));
        let view = service.get_status(&id.to_string()).await.unwrap();
        assert_eq!(view.status, OrderStatus::Ready);
    }

    #[tokio::test]
    async fn strict_policy_leaves_payment_only_updates_unguarded() {
        let service = strict_service();
        let id = service.create_order(checkout(1)).await.unwrap().order.id;
        service
            .update_status(&id.to_string(), set_status("cancelled"))
            .await
            .unwrap();

        let updated = service
            .update_status(&id.to_string(), set_payment("failed"))
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Cancelled);
        assert_eq!(updated.payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn strict_policy_missing_order_is_not_found() {
        let service = strict_service();

        let err = service
            .update_status("PED202501011234", set_status("ready"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_strict_updates_cannot_leave_a_terminal_status() {
        let service = Arc::new(strict_service());

        for _ in 0..50 {
            let id = service
                .create_order(checkout(1))
                .await
                .unwrap()
                .order
                .id
                .to_string();

            let complete = tokio::spawn({
                let service = Arc::clone(&service);
                let id = id.clone();
                async move { service.update_status(&id, set_status("completed")).await }
            });
            let ready = tokio::spawn({
                let service = Arc::clone(&service);
                let id = id.clone();
                async move { service.update_status(&id, set_status("ready")).await }
            });

            complete.await.unwrap().unwrap();
            // ready either lands before completed or is rejected after it
            if let Err(err) = ready.await.unwrap() {
                assert!(matches!(
                    err,
                    DomainError::Order(OrderError::IllegalTransition {
                        from: OrderStatus::Completed,
                        to: OrderStatus::Ready
                    })
                ));
            }

            let view = service.get_status(&id).await.unwrap();
            assert_eq!(view.status, OrderStatus::Completed);
        }
    }

    #[tokio::test]
    async fn default_policy_accepts_any_domain_value() {
        let service = create_service();
        let id = service.create_order(checkout(1)).await.unwrap().order.id;
        service
            .update_status(&id.to_string(), set_status("completed"))
            .await
            .unwrap();

        let updated = service
            .update_status(&id.to_string(), set_status("ready"))
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Ready);

        let updated = service
            .update_status(&id.to_string(), set_status("pending"))
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let service = create_service();

        let err = service
            .update_status("12345", set_payment("completed"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        let err = service
            .update_status("PED202501011234", set_status("ready"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn cancel_from_any_status_is_idempotent() {
        let service = create_service();
        let id = service.create_order(checkout(1)).await.unwrap().order.id;
        service
            .update_status(&id.to_string(), set_status("completed"))
            .await
            .unwrap();

        let first = service.cancel_order(&id.to_string()).await.unwrap();
        let second = service.cancel_order(&id.to_string()).await.unwrap();

        assert_eq!(first.status, OrderStatus::Cancelled);
        assert_eq!(second.status, OrderStatus::Cancelled);
        assert_eq!(second.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn cancel_missing_order_is_store_error() {
        let service = create_service();

        let err = service
            .cancel_order(&OrderId::new(9).to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Store(ref e) if e.is_no_rows()));
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn second_page_holds_records_21_to_40() {
        let service = create_service();
        let mut ids = Vec::new();
        for _ in 0..45 {
            ids.push(service.create_order(checkout(1)).await.unwrap().order.id);
        }
        ids.reverse();

        let listing = service
            .list_orders(OrderListParams {
                page: Some(2),
                limit: Some(20),
                ..Default::default()
            })
            .await
            .unwrap();

        let page_ids: Vec<OrderId> = listing.data.iter().map(|o| o.order.id).collect();
        assert_eq!(page_ids, ids[20..40]);
        assert_eq!(listing.meta.total, 45);
        assert_eq!(listing.meta.pages, 3);
        assert_eq!(listing.meta.page, 2);
        assert!(listing.data.iter().all(|o| o.items.len() == 1));
    }

    #[tokio::test]
    async fn filters_by_status_and_time() {
        let service = create_service();
        let old = service.create_order(checkout(0)).await.unwrap().order.id;
        let ready = service.create_order(checkout(0)).await.unwrap().order.id;
        service
            .store()
            .backdate_order(old, Utc::now() - Duration::days(10))
            .await;
        service
            .update_status(&ready.to_string(), set_status("ready"))
            .await
            .unwrap();

        let listing = service
            .list_orders(OrderListParams {
                status: Some("ready".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listing.meta.total, 1);
        assert_eq!(listing.data[0].order.id, ready);

        let since = (Utc::now() - Duration::days(2)).format("%Y-%m-%d").to_string();
        let listing = service
            .list_orders(OrderListParams {
                from: Some(since),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listing.meta.total, 1);
    }

    #[tokio::test]
    async fn bad_filter_is_validation_error() {
        let service = create_service();

        let err = service
            .list_orders(OrderListParams {
                payment_status: Some("refunded".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(err.is_validation());
    }
}

mod summary {
    use super::*;

    #[tokio::test]
    async fn revenue_counts_only_completed_payments() {
        let service = create_service();

        let mut ids = Vec::new();
        for total in [1050, 2000, 9900, 500] {
            let mut request = checkout(0);
            request.total_amount = Some(Decimal::new(total, 2));
            ids.push(service.create_order(request).await.unwrap().order.id.to_string());
        }
        service.update_status(&ids[0], set_payment("completed")).await.unwrap();
        service.update_status(&ids[1], set_payment("completed")).await.unwrap();
        service.update_status(&ids[2], set_payment("failed")).await.unwrap();
        service.update_status(&ids[1], set_status("confirmed")).await.unwrap();
        service.update_status(&ids[2], set_status("ready")).await.unwrap();

        let summary = service.summary().await.unwrap();

        assert_eq!(summary.total_orders, 4);
        assert_eq!(summary.revenue, Decimal::new(3050, 2));
        assert_eq!(summary.status_breakdown.pending, 2);
        assert_eq!(summary.status_breakdown.ready, 1);
        let json = serde_json::to_value(summary.status_breakdown).unwrap();
        assert!(json.get("confirmed").is_none());
    }

    #[tokio::test]
    async fn store_error_aborts_summary() {
        let service = create_service();
        service.create_order(checkout(0)).await.unwrap();
        service.store().set_fail_on_read(true);

        assert!(matches!(
            service.summary().await,
            Err(DomainError::Store(_))
        ));
    }
}
