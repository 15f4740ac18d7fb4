//! The checkout flow talking to the API over real HTTP.
//!
//! The server side is the production wire format and error mapping in front
//! of a service over fakes, so no database or gateway account is needed.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use saumara_core::cart::{Cart, MemoryStorage};
use saumara_core::{IntentId, PaymentId, Rupees};
use saumara_integration_tests::{
    FakeCheckout, Harness, ScriptedWidget, WidgetScript, line, snapshot, valid_form,
};
use saumara_storefront::checkout::wire::{IntentBody, IntentResponse, OrderBody, PlacedResponse};
use saumara_storefront::checkout::{
    CheckoutBackend, CheckoutError, CheckoutFlow, CheckoutOutcome, HttpCheckoutBackend,
    OrderSubmission,
};
use saumara_storefront::error::AppError;

async fn create_intent(
    State(service): State<Arc<FakeCheckout>>,
    Json(body): Json<IntentBody>,
) -> Result<Json<IntentResponse>, AppError> {
    let created = service.create_intent(&body.items, body.amount).await?;
    Ok(Json(created.into()))
}

async fn create_order(
    State(service): State<Arc<FakeCheckout>>,
    Json(body): Json<OrderBody>,
) -> Result<Json<PlacedResponse>, AppError> {
    let placed = service.place_order(OrderSubmission::from(body)).await?;
    Ok(Json(PlacedResponse {
        order_number: placed.order.order_number.clone(),
        order: placed.order,
    }))
}

async fn serve(harness: &Harness) -> SocketAddr {
    let app = Router::new()
        .route("/api/razorpay", post(create_intent))
        .route("/api/orders", post(create_order))
        .with_state(Arc::new(harness.service()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn backend(harness: &Harness) -> HttpCheckoutBackend {
    let addr = serve(harness).await;
    HttpCheckoutBackend::new(&format!("http://{addr}")).unwrap()
}

fn flow(
    backend: HttpCheckoutBackend,
    script: impl IntoIterator<Item = WidgetScript>,
) -> CheckoutFlow<HttpCheckoutBackend, ScriptedWidget, MemoryStorage> {
    let mut cart = Cart::restore(MemoryStorage::new());
    cart.add(snapshot("p1", 1500), 2).unwrap();
    CheckoutFlow::new(backend, ScriptedWidget::new(script), cart)
}

#[tokio::test]
async fn test_checkout_over_http() {
    let harness = Harness::new([snapshot("p1", 1500)]);
    let flow = flow(backend(&harness).await, [WidgetScript::Pay]);

    let outcome = flow.submit(&valid_form()).await;

    let CheckoutOutcome::Completed { order_number, .. } = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    let orders = harness.store.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_number, order_number);
    assert_eq!(orders[0].total, Rupees::new(3199));
    assert_eq!(flow.with_cart(|cart| cart.items().len()), 0);
}

#[tokio::test]
async fn test_errors_cross_the_wire_intact() {
    let harness = Harness::new([snapshot("p1", 1500)]);
    let backend = backend(&harness).await;

    let err = backend
        .request_intent(&[line("ghost", 10, 1)], Rupees::new(10))
        .await
        .unwrap_err();
    assert_eq!(err, CheckoutError::UnknownProduct("ghost".into()));

    let err = backend.request_intent(&[], Rupees::ZERO).await.unwrap_err();
    assert_eq!(err, CheckoutError::EmptyCart);

    let mut form = valid_form();
    form.phone = String::new();
    let err = backend
        .submit_order(OrderSubmission {
            form,
            items: vec![line("p1", 1500, 1)],
            confirmation: saumara_integration_tests::FakeGateway::confirm(
                &IntentId::new("order_x"),
                "pay_x",
            ),
            client_totals: None,
        })
        .await
        .unwrap_err();
    let CheckoutError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(errors.has("phone"));
}

#[tokio::test]
async fn test_inflated_order_is_refused_over_http() {
    let harness = Harness::new([snapshot("p1", 1500)]);
    let backend = backend(&harness).await;
    let created = backend
        .request_intent(&[line("p1", 1500, 1)], Rupees::new(1699))
        .await
        .unwrap();

    let err = backend
        .submit_order(OrderSubmission {
            form: valid_form(),
            items: vec![line("p1", 1500, 10)],
            confirmation: saumara_integration_tests::FakeGateway::confirm(
                &created.intent.intent_id,
                "pay_x",
            ),
            client_totals: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::AmountMismatch(_)));
    assert!(harness.store.orders().is_empty());
    assert_eq!(harness.failures.records().len(), 1);
}

#[tokio::test]
async fn test_bad_signature_over_http() {
    let harness = Harness::new([snapshot("p1", 1500)]);
    let flow = flow(
        backend(&harness).await,
        [WidgetScript::PayWithSignature("f".repeat(64))],
    );

    let outcome = flow.submit(&valid_form()).await;

    assert_eq!(outcome, CheckoutOutcome::Failed(CheckoutError::SignatureInvalid));
    assert!(harness.store.orders().is_empty());
    assert_eq!(flow.with_cart(|cart| cart.items().len()), 1);
}

#[tokio::test]
async fn test_store_outage_over_http_orphans_payment() {
    let harness = Harness::new([snapshot("p1", 1500)]);
    harness.store.set_unavailable(true);
    let flow = flow(backend(&harness).await, [WidgetScript::Pay]);

    let outcome = flow.submit(&valid_form()).await;

    let CheckoutOutcome::Orphaned {
        payment_id, error, ..
    } = outcome
    else {
        panic!("expected orphaned payment, got {outcome:?}");
    };
    assert_eq!(payment_id, PaymentId::new("pay_test_1"));
    assert!(matches!(error, CheckoutError::StoreUnavailable(_)));
    assert_eq!(harness.failures.records().len(), 1);

    harness.store.set_unavailable(false);
    assert!(matches!(
        flow.submit(&valid_form()).await,
        CheckoutOutcome::Completed { .. }
    ));
    assert_eq!(harness.gateway.requests().len(), 1);
}

#[tokio::test]
async fn test_unreachable_server_fails_before_payment() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let backend = HttpCheckoutBackend::new(&format!("http://{addr}")).unwrap();
    let flow = flow(backend, [WidgetScript::Pay]);

    let outcome = flow.submit(&valid_form()).await;

    assert!(matches!(
        outcome,
        CheckoutOutcome::Failed(CheckoutError::GatewayUnavailable(_))
    ));
    assert!(flow.widget().opened().is_empty());
}
