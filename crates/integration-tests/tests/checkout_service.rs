//! `CheckoutService` against in-memory ports.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use saumara_core::{
    CartItem, IntentId, OrderNumber, Paise, PaymentConfirmation, PaymentId, ProductId, Rupees,
};
use saumara_integration_tests::{FakeCheckout, FakeGateway, Harness, line, snapshot, valid_form};
use saumara_storefront::checkout::{CheckoutError, CheckoutService, JsonlFailureLog, OrderSubmission};

fn harness() -> Harness {
    Harness::new([snapshot("p1", 1500), snapshot("p2", 450)])
}

/// Open an intent for `items` and pay it.
async fn pay(service: &FakeCheckout, items: &[CartItem], payment: &str) -> PaymentConfirmation {
    let created = service.create_intent(items, None).await.unwrap();
    FakeGateway::confirm(&created.intent.intent_id, payment)
}

fn submission(items: Vec<CartItem>, confirmation: PaymentConfirmation) -> OrderSubmission {
    OrderSubmission {
        form: valid_form(),
        items,
        confirmation,
        client_totals: None,
    }
}

async fn paid_submission(service: &FakeCheckout, items: Vec<CartItem>, payment: &str) -> OrderSubmission {
    let confirmation = pay(service, &items, payment).await;
    submission(items, confirmation)
}

// =============================================================================
// Intents
// =============================================================================

#[tokio::test]
async fn test_intent_charges_server_total_in_paise() {
    let h = harness();
    let service = h.service();

    let created = service
        .create_intent(&[line("p1", 1500, 1), line("p2", 450, 2)], Some(Rupees::new(2400)))
        .await
        .unwrap();

    assert_eq!(created.breakdown.subtotal, Rupees::new(2400));
    assert_eq!(created.breakdown.shipping, Rupees::ZERO);
    assert_eq!(created.intent.amount_paise, Paise::new(240_000));
    assert_eq!(created.intent.currency.code(), "INR");
    assert!(created.intent.receipt.starts_with("receipt_"));
    assert_eq!(created.key_id.as_deref(), Some("rzp_test_fake"));
    assert_eq!(h.gateway.requests().len(), 1);
}

#[tokio::test]
async fn test_intent_ignores_client_amount() {
    let h = harness();

    let created = h
        .service()
        .create_intent(&[line("p1", 1, 1)], Some(Rupees::new(1)))
        .await
        .unwrap();

    assert_eq!(created.breakdown.total, Rupees::new(1699));
    assert_eq!(created.items[0].product.price, Rupees::new(1500));
}

#[tokio::test]
async fn test_intent_merges_duplicate_lines() {
    let h = harness();

    let created = h
        .service()
        .create_intent(&[line("p2", 450, 1), line("p2", 450, 2), line("p1", 1500, 0)], None)
        .await
        .unwrap();

    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].quantity, 3);
    assert_eq!(created.breakdown.subtotal, Rupees::new(1350));
}

#[tokio::test]
async fn test_intent_rejects_empty_and_unknown() {
    let h = harness();
    let service = h.service();

    assert_eq!(
        service.create_intent(&[], None).await.unwrap_err(),
        CheckoutError::EmptyCart
    );
    assert_eq!(
        service.create_intent(&[line("p1", 1500, 0)], None).await.unwrap_err(),
        CheckoutError::EmptyCart
    );
    assert_eq!(
        service
            .create_intent(&[line("ghost", 999, 1)], None)
            .await
            .unwrap_err(),
        CheckoutError::UnknownProduct(ProductId::new("ghost"))
    );
    assert!(h.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_intent_gateway_down() {
    let h = harness();
    h.gateway.set_unavailable(true);

    let err = h
        .service()
        .create_intent(&[line("p1", 1500, 1)], None)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::GatewayUnavailable(_)));
}

// =============================================================================
// Placement
// =============================================================================

#[tokio::test]
async fn test_place_order_stores_server_priced_order() {
    let h = harness();
    let service = h.service();
    let mut sub = paid_submission(&service, vec![line("p1", 10, 2)], "pay_A").await;
    sub.client_totals = Some(saumara_core::PriceBreakdown::from_subtotal(Rupees::new(20)));

    let placed = service.place_order(sub).await.unwrap();

    assert!(!placed.replayed);
    let order = placed.order;
    assert_eq!(order.subtotal, Rupees::new(3000));
    assert_eq!(order.shipping, Rupees::new(199));
    assert_eq!(order.total, Rupees::new(3199));
    assert_eq!(order.items[0].product.price, Rupees::new(1500));
    assert_eq!(order.customer_email.as_str(), "ananya@example.in");
    assert_eq!(order.shipping_address.city, "Bengaluru");
    assert!(OrderNumber::parse(order.order_number.as_str()).is_ok());
    assert_eq!(h.store.orders().len(), 1);
}

#[tokio::test]
async fn test_place_order_replay_returns_existing_order() {
    let h = harness();
    let service = h.service();
    let sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;

    let first = service.place_order(sub.clone()).await.unwrap();
    let second = service.place_order(sub).await.unwrap();

    assert!(second.replayed);
    assert_eq!(second.order.order_number, first.order.order_number);
    assert_eq!(h.store.orders().len(), 1);
    assert_eq!(h.store.insert_attempts(), 1);
}

#[tokio::test]
async fn test_place_order_regenerates_number_on_collision() {
    let h = harness();
    let service = h.service();
    let sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    h.store.collide_next(3);

    let placed = service.place_order(sub).await.unwrap();

    assert_eq!(h.store.insert_attempts(), 4);
    assert_eq!(h.store.orders()[0].order_number, placed.order.order_number);
    assert!(h.failures.records().is_empty());
}

#[tokio::test]
async fn test_place_order_gives_up_after_regenerations() {
    let h = harness();
    let service = h.service();
    let sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    h.store.collide_next(4);

    let err = service.place_order(sub).await.unwrap_err();

    assert_eq!(err, CheckoutError::DuplicateOrderNumber);
    assert_eq!(h.store.insert_attempts(), 4);
    assert!(h.store.orders().is_empty());
    let records = h.failures.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payment_id, PaymentId::new("pay_A"));
}

#[tokio::test]
async fn test_place_order_rejects_bad_signature_without_side_effects() {
    let h = harness();
    let service = h.service();
    let mut sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    sub.confirmation = PaymentConfirmation {
        signature: FakeGateway::confirm(&sub.confirmation.intent_id, "pay_B").signature,
        ..sub.confirmation
    };

    let err = service.place_order(sub).await.unwrap_err();

    assert_eq!(err, CheckoutError::SignatureInvalid);
    assert_eq!(h.store.insert_attempts(), 0);
    assert!(h.failures.records().is_empty());
}

#[tokio::test]
async fn test_place_order_checks_signature_before_form() {
    let h = harness();
    let service = h.service();
    let mut sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    sub.form.email = "not-an-email".to_string();
    sub.confirmation.signature = "garbage".to_string();

    let err = service.place_order(sub).await.unwrap_err();

    assert_eq!(err, CheckoutError::SignatureInvalid);
    assert!(h.failures.records().is_empty());
}

#[tokio::test]
async fn test_place_order_records_form_rejected_after_payment() {
    let h = harness();
    let service = h.service();
    let mut sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    sub.form.email = format!("{}@example.in", "a".repeat(250));

    let err = service.place_order(sub).await.unwrap_err();

    let CheckoutError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(errors.has("email"));
    assert!(h.store.orders().is_empty());
    let records = h.failures.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payment_id, PaymentId::new("pay_A"));
    assert_eq!(records[0].customer.name, "Ananya Rao");
}

#[tokio::test]
async fn test_place_order_records_empty_items_after_payment() {
    let h = harness();
    let service = h.service();
    let confirmation = pay(&service, &[line("p1", 1500, 1)], "pay_A").await;

    let err = service
        .place_order(submission(Vec::new(), confirmation))
        .await
        .unwrap_err();

    assert_eq!(err, CheckoutError::EmptyCart);
    assert_eq!(h.failures.records().len(), 1);
}

#[tokio::test]
async fn test_place_order_rejects_mock_intent() {
    let h = harness();
    let confirmation = FakeGateway::confirm(&IntentId::mock(1_700_000_000_000), "pay_A");

    let err = h
        .service()
        .place_order(submission(vec![line("p1", 1500, 1)], confirmation))
        .await
        .unwrap_err();

    assert_eq!(err, CheckoutError::SignatureInvalid);
    assert_eq!(h.store.insert_attempts(), 0);
    assert!(h.failures.records().is_empty());
}

#[tokio::test]
async fn test_place_order_store_outage_is_recorded() {
    let h = harness();
    let service = h.service();
    let sub = paid_submission(&service, vec![line("p2", 450, 2)], "pay_A").await;
    let intent_id = sub.confirmation.intent_id.clone();
    h.store.set_unavailable(true);

    let err = service.place_order(sub).await.unwrap_err();

    assert!(matches!(err, CheckoutError::StoreUnavailable(_)));
    let records = h.failures.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.intent_id, intent_id);
    assert_eq!(record.payment_id, PaymentId::new("pay_A"));
    assert_eq!(record.subtotal, Rupees::new(900));
    assert_eq!(record.total, Rupees::new(1099));
    assert!(!record.error.is_empty());
}

#[tokio::test]
async fn test_store_outage_is_appended_to_failure_log() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failures.jsonl");
    let service = CheckoutService::new(
        h.gateway.clone(),
        h.store.clone(),
        h.catalog.clone(),
        Arc::new(JsonlFailureLog::new(&path)),
    );
    let sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    h.store.set_unavailable(true);

    service.place_order(sub).await.unwrap_err();

    let records = JsonlFailureLog::read_all(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payment_id, PaymentId::new("pay_A"));
    assert_eq!(records[0].total, Rupees::new(1699));
}

#[tokio::test]
async fn test_place_order_unknown_product_after_payment_is_recorded() {
    let h = harness();
    let service = h.service();
    let confirmation = pay(&service, &[line("p1", 1500, 1)], "pay_A").await;

    let err = service
        .place_order(submission(vec![line("retired", 800, 1)], confirmation))
        .await
        .unwrap_err();

    assert_eq!(err, CheckoutError::UnknownProduct(ProductId::new("retired")));
    assert_eq!(h.failures.records().len(), 1);
}

#[tokio::test]
async fn test_orders_read_back_newest_first() {
    let h = harness();
    let service = h.service();
    let sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    let first = service.place_order(sub).await.unwrap().order;
    let sub = paid_submission(&service, vec![line("p2", 450, 1)], "pay_B").await;
    let second = service.place_order(sub).await.unwrap().order;

    let found = service.find_order(&first.order_number).await.unwrap();
    assert_eq!(found.map(|o| o.razorpay_payment_id), Some(PaymentId::new("pay_A")));

    let listed: Vec<_> = service
        .list_orders()
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.order_number)
        .collect();
    assert_eq!(listed, vec![second.order_number, first.order_number]);
}

// =============================================================================
// Charged amount
// =============================================================================

#[tokio::test]
async fn test_order_larger_than_charge_is_refused() {
    let h = harness();
    let service = h.service();
    let confirmation = pay(&service, &[line("p1", 1500, 1)], "pay_A").await;

    let err = service
        .place_order(submission(vec![line("p1", 1500, 10)], confirmation))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CheckoutError::AmountMismatch("charged 169900 paise, order is 1500000 paise".to_string())
    );
    assert_eq!(h.store.insert_attempts(), 0);
    let records = h.failures.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payment_id, PaymentId::new("pay_A"));
    assert_eq!(records[0].items[0].quantity, 10);
}

#[tokio::test]
async fn test_stored_total_equals_charged_amount() {
    let h = harness();
    let service = h.service();
    let items = vec![line("p1", 1500, 1), line("p2", 450, 3)];
    let created = service.create_intent(&items, None).await.unwrap();
    let confirmation = FakeGateway::confirm(&created.intent.intent_id, "pay_A");

    let order = service
        .place_order(submission(items, confirmation))
        .await
        .unwrap()
        .order;

    assert_eq!(order.total.to_paise(), created.intent.amount_paise);
}

#[tokio::test]
async fn test_price_change_between_intent_and_order_is_refused() {
    let h = harness();
    let service = h.service();
    let sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    h.catalog.set_price("p1", 1800);

    let err = service.place_order(sub).await.unwrap_err();

    assert!(matches!(err, CheckoutError::AmountMismatch(_)));
    assert!(h.store.orders().is_empty());
    assert_eq!(h.failures.records().len(), 1);
}

#[tokio::test]
async fn test_unreadable_charge_is_recorded() {
    let h = harness();
    let service = h.service();
    let sub = paid_submission(&service, vec![line("p1", 1500, 1)], "pay_A").await;
    h.gateway.set_unavailable(true);

    let err = service.place_order(sub).await.unwrap_err();

    assert!(matches!(err, CheckoutError::GatewayUnavailable(_)));
    assert!(h.store.orders().is_empty());
    assert_eq!(h.failures.records().len(), 1);
}
