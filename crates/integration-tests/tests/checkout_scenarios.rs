//! End-to-end checkout: cart, flow, service and fakes wired together.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use saumara_core::cart::{Cart, MemoryStorage};
use saumara_core::{IntentId, Paise, PaymentId, Rupees};
use saumara_integration_tests::{
    FakeCheckout, Harness, RecordingBackend, ScriptedWidget, TEST_KEY_ID, WidgetScript, snapshot,
    valid_form,
};
use saumara_core::CartStorage;
use saumara_storefront::checkout::{
    CheckoutError, CheckoutFlow, CheckoutOutcome, CheckoutState, UNSETTLED_PAYMENT_KEY,
};

type Flow = CheckoutFlow<RecordingBackend<FakeCheckout>, ScriptedWidget, MemoryStorage>;

struct Scenario {
    price: u64,
    harness: Harness,
    storage: MemoryStorage,
    flow: Flow,
}

impl Scenario {
    fn new(price: u64, script: impl IntoIterator<Item = WidgetScript>) -> Self {
        let harness = Harness::new([snapshot("p1", price)]);
        let storage = MemoryStorage::new();
        let flow = CheckoutFlow::new(
            RecordingBackend::new(harness.service()),
            ScriptedWidget::new(script),
            Cart::restore(storage.clone()),
        );
        Self {
            price,
            harness,
            storage,
            flow,
        }
    }

    fn add(&self, quantity: u32) {
        let product = snapshot("p1", self.price);
        self.flow.with_cart(|cart| cart.add(product, quantity)).unwrap();
    }

    fn cart_lines(&self) -> usize {
        self.flow.with_cart(|cart| cart.items().len())
    }

    fn persisted_cart_lines(&self) -> usize {
        Cart::restore(self.storage.clone()).items().len()
    }
}

#[tokio::test]
async fn test_empty_cart_makes_no_calls() {
    let s = Scenario::new(1500, [WidgetScript::Pay]);

    let outcome = s.flow.submit(&valid_form()).await;

    assert_eq!(outcome, CheckoutOutcome::EmptyCart);
    assert_eq!(s.flow.state(), CheckoutState::Idle);
    assert_eq!(s.flow.backend().network_calls(), 0);
    assert!(s.flow.widget().opened().is_empty());
    assert!(s.harness.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_form_makes_no_calls() {
    let s = Scenario::new(1500, [WidgetScript::Pay]);
    s.add(1);
    let mut form = valid_form();
    form.state = "Atlantis".to_string();
    form.pincode = "5600".to_string();

    let outcome = s.flow.submit(&form).await;

    let CheckoutOutcome::Invalid(errors) = outcome else {
        panic!("expected field errors, got {outcome:?}");
    };
    let fields = errors.field_names();
    assert!(fields.contains(&"state"));
    assert!(fields.contains(&"pincode"));
    assert_eq!(s.flow.backend().network_calls(), 0);
    assert!(!s.flow.is_loading());
}

#[tokio::test]
async fn test_shipping_charged_at_threshold() {
    let s = Scenario::new(2000, [WidgetScript::Dismiss]);
    s.add(1);

    s.flow.submit(&valid_form()).await;

    let requests = s.harness.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, Paise::new(219_900));
}

#[tokio::test]
async fn test_shipping_free_above_threshold() {
    let s = Scenario::new(2001, [WidgetScript::Dismiss]);
    s.add(1);

    s.flow.submit(&valid_form()).await;

    assert_eq!(s.harness.gateway.requests()[0].amount, Paise::new(200_100));
}

#[tokio::test]
async fn test_happy_path_places_order_and_clears_cart() {
    let s = Scenario::new(1500, [WidgetScript::Pay]);
    s.add(2);

    let outcome = s.flow.submit(&valid_form()).await;

    let CheckoutOutcome::Completed {
        order_number,
        redirect,
    } = outcome
    else {
        panic!("expected completion, got {outcome:?}");
    };
    assert!(order_number.as_str().starts_with("SAU-"));
    assert_eq!(redirect, format!("/order-confirmation?order={order_number}"));

    let opened = s.flow.widget().opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].key, TEST_KEY_ID);
    assert_eq!(opened[0].amount, Paise::new(319_900));
    assert_eq!(opened[0].order_id, IntentId::new("order_test_1"));
    assert_eq!(opened[0].prefill.name, "Ananya Rao");

    let orders = s.harness.store.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.order_number, order_number);
    assert_eq!(order.subtotal, Rupees::new(3000));
    assert_eq!(order.shipping, Rupees::new(199));
    assert_eq!(order.total, Rupees::new(3199));
    assert_eq!(order.razorpay_order_id, IntentId::new("order_test_1"));
    assert_eq!(order.razorpay_payment_id, PaymentId::new("pay_test_1"));
    assert_eq!(order.shipping_address.pincode.as_str(), "560001");

    assert_eq!(s.cart_lines(), 0);
    assert_eq!(s.persisted_cart_lines(), 0);
    assert!(matches!(s.flow.state(), CheckoutState::Done { .. }));
    assert!(!s.flow.is_loading());
    assert!(s.harness.failures.records().is_empty());
}

#[tokio::test]
async fn test_state_sequence_on_success() {
    let s = Scenario::new(1500, [WidgetScript::Pay]);
    s.add(1);

    s.flow.submit(&valid_form()).await;

    let history: Vec<_> = s
        .flow
        .history()
        .into_iter()
        .map(|state| match state {
            CheckoutState::Idle => "idle",
            CheckoutState::Validating => "validating",
            CheckoutState::CreatingIntent => "creating_intent",
            CheckoutState::AwaitingGateway { .. } => "awaiting_gateway",
            CheckoutState::Persisting { .. } => "persisting",
            CheckoutState::Done { .. } => "done",
            CheckoutState::PaymentOrphaned { .. } => "orphaned",
        })
        .collect();
    assert_eq!(
        history,
        vec![
            "validating",
            "creating_intent",
            "awaiting_gateway",
            "persisting",
            "done"
        ]
    );
}

#[tokio::test]
async fn test_dismissal_keeps_cart_and_releases_latch() {
    let s = Scenario::new(1500, [WidgetScript::Dismiss]);
    s.add(1);

    let outcome = s.flow.submit(&valid_form()).await;

    assert_eq!(outcome, CheckoutOutcome::Dismissed);
    assert!(outcome.toast().is_none());
    assert_eq!(s.cart_lines(), 1);
    assert_eq!(s.persisted_cart_lines(), 1);
    assert_eq!(s.harness.store.insert_attempts(), 0);
    assert_eq!(s.flow.state(), CheckoutState::Idle);
    assert!(!s.flow.is_loading());
}

#[tokio::test]
async fn test_widget_failure_surfaces_toast() {
    let s = Scenario::new(1500, [WidgetScript::Fail("card declined".to_string())]);
    s.add(1);

    let outcome = s.flow.submit(&valid_form()).await;

    assert_eq!(
        outcome,
        CheckoutOutcome::Failed(CheckoutError::GatewayUnavailable("card declined".to_string()))
    );
    assert!(outcome.toast().is_some());
    assert_eq!(s.cart_lines(), 1);
    assert_eq!(s.harness.store.insert_attempts(), 0);
}

#[tokio::test]
async fn test_gateway_outage_fails_before_widget() {
    let s = Scenario::new(1500, [WidgetScript::Pay]);
    s.add(1);
    s.harness.gateway.set_unavailable(true);

    let outcome = s.flow.submit(&valid_form()).await;

    assert!(matches!(
        outcome,
        CheckoutOutcome::Failed(CheckoutError::GatewayUnavailable(_))
    ));
    assert_eq!(
        outcome.toast().as_deref(),
        Some("Payment gateway unreachable. Please try again.")
    );
    assert!(s.flow.widget().opened().is_empty());
    assert_eq!(s.cart_lines(), 1);
}

#[tokio::test]
async fn test_bad_signature_is_not_persisted() {
    let s = Scenario::new(1500, [WidgetScript::PayWithSignature("0".repeat(64))]);
    s.add(1);

    let outcome = s.flow.submit(&valid_form()).await;

    assert_eq!(outcome, CheckoutOutcome::Failed(CheckoutError::SignatureInvalid));
    assert_eq!(s.harness.store.insert_attempts(), 0);
    assert!(s.harness.store.orders().is_empty());
    assert!(s.harness.failures.records().is_empty());
    assert_eq!(s.cart_lines(), 1);
    assert!(!s.flow.has_unsettled_payment());
}

#[tokio::test]
async fn test_store_outage_orphans_payment_then_retry_settles_it() {
    let s = Scenario::new(1500, [WidgetScript::Pay]);
    s.add(2);
    s.harness.store.set_unavailable(true);

    let outcome = s.flow.submit(&valid_form()).await;

    let CheckoutOutcome::Orphaned {
        ref intent_id,
        ref payment_id,
        ref error,
    } = outcome
    else {
        panic!("expected orphaned payment, got {outcome:?}");
    };
    assert_eq!(intent_id, &IntentId::new("order_test_1"));
    assert_eq!(payment_id, &PaymentId::new("pay_test_1"));
    assert!(matches!(error, CheckoutError::StoreUnavailable(_)));
    assert!(outcome.toast().unwrap().contains("pay_test_1"));

    let records = s.harness.failures.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].intent_id, IntentId::new("order_test_1"));
    assert_eq!(records[0].payment_id, PaymentId::new("pay_test_1"));
    assert_eq!(records[0].total, Rupees::new(3199));
    assert_eq!(records[0].customer.email, "ananya@example.in");

    assert_eq!(s.cart_lines(), 1);
    assert!(s.flow.has_unsettled_payment());
    assert!(matches!(
        s.flow.state(),
        CheckoutState::PaymentOrphaned { .. }
    ));

    s.harness.store.set_unavailable(false);
    let retry = s.flow.submit(&valid_form()).await;

    assert!(matches!(retry, CheckoutOutcome::Completed { .. }));
    assert_eq!(s.harness.gateway.requests().len(), 1);
    assert_eq!(s.flow.widget().opened().len(), 1);
    assert_eq!(s.flow.backend().intent_calls(), 1);
    let orders = s.harness.store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].razorpay_payment_id, PaymentId::new("pay_test_1"));
    assert_eq!(s.cart_lines(), 0);
    assert!(!s.flow.has_unsettled_payment());
}

#[tokio::test]
async fn test_unsettled_payment_survives_reload() {
    let s = Scenario::new(1500, [WidgetScript::Pay]);
    s.add(1);
    s.harness.store.set_unavailable(true);
    assert!(matches!(
        s.flow.submit(&valid_form()).await,
        CheckoutOutcome::Orphaned { .. }
    ));
    assert!(s.storage.read(UNSETTLED_PAYMENT_KEY).is_some());

    // A fresh page over the same storage, with a widget that would pay again.
    s.harness.store.set_unavailable(false);
    let reloaded: Flow = CheckoutFlow::new(
        RecordingBackend::new(s.harness.service()),
        ScriptedWidget::new([WidgetScript::Pay]),
        Cart::restore(s.storage.clone()),
    );
    assert!(reloaded.has_unsettled_payment());

    let outcome = reloaded.submit(&valid_form()).await;

    assert!(matches!(outcome, CheckoutOutcome::Completed { .. }));
    assert!(reloaded.widget().opened().is_empty());
    assert_eq!(reloaded.backend().intent_calls(), 0);
    assert_eq!(s.harness.gateway.requests().len(), 1);
    let orders = s.harness.store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].razorpay_payment_id, PaymentId::new("pay_test_1"));
    assert!(!reloaded.has_unsettled_payment());
    assert_eq!(s.storage.read(UNSETTLED_PAYMENT_KEY).as_deref(), Some("null"));
    assert_eq!(s.persisted_cart_lines(), 0);
}

#[tokio::test]
async fn test_unreadable_unsettled_payment_is_ignored() {
    let storage = MemoryStorage::new().with_value(UNSETTLED_PAYMENT_KEY, "{not json");
    let harness = Harness::new([snapshot("p1", 1500)]);

    let flow: Flow = CheckoutFlow::new(
        RecordingBackend::new(harness.service()),
        ScriptedWidget::default(),
        Cart::restore(storage),
    );

    assert!(!flow.has_unsettled_payment());
}

#[tokio::test]
async fn test_tampered_cart_price_is_charged_at_catalog_price() {
    let s = Scenario::new(1500, [WidgetScript::Pay]);
    s.flow
        .with_cart(|cart| cart.add(snapshot("p1", 1), 2))
        .unwrap();

    let outcome = s.flow.submit(&valid_form()).await;

    assert!(matches!(outcome, CheckoutOutcome::Completed { .. }));
    assert_eq!(s.harness.gateway.requests()[0].amount, Paise::new(319_900));
    assert_eq!(s.harness.store.orders()[0].total, Rupees::new(3199));
}

#[tokio::test]
async fn test_second_checkout_after_completion_starts_fresh() {
    let s = Scenario::new(1500, [WidgetScript::Pay, WidgetScript::Pay]);
    s.add(1);
    s.flow.submit(&valid_form()).await;
    s.add(3);

    let outcome = s.flow.submit(&valid_form()).await;

    assert!(matches!(outcome, CheckoutOutcome::Completed { .. }));
    let orders = s.harness.store.orders();
    assert_eq!(orders.len(), 2);
    assert_ne!(orders[0].order_number, orders[1].order_number);
    assert_eq!(orders[1].razorpay_order_id, IntentId::new("order_test_2"));
    assert_eq!(orders[1].total, Rupees::new(4500));
}
