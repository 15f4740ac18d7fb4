//! Integration tests for Saumara.
//!
//! In-memory stand-ins for every port the checkout pipeline talks to, so
//! the scenario tests in `tests/` can drive the real [`CheckoutService`]
//! and [`CheckoutFlow`](saumara_storefront::checkout::CheckoutFlow) without
//! a database, a gateway account, or a browser.
//!
//! # Running Tests
//!
//! ```bash
//! # Fakes only
//! cargo test -p saumara-integration-tests
//!
//! # Also the live-server tests (needs a migrated database and a running server)
//! cargo test -p saumara-integration-tests -- --ignored
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use saumara_core::{
    CartItem, Category, CheckoutForm, IntentId, IntentRequest, NewOrder, Order, OrderId,
    OrderNumber, Paise, PaymentConfirmation, PaymentFailure, PaymentId, ProductId,
    ProductSnapshot, Rupees,
};
use saumara_storefront::checkout::failures::FailureLogError;
use saumara_storefront::checkout::{
    CatalogUnavailable, CheckoutBackend, CheckoutError, CheckoutService, CreatedIntent,
    FailureSink, GatewayWidget, OrderStore, OrderSubmission, PriceCatalog, StoreError,
    WidgetOptions, WidgetOutcome,
};
use saumara_storefront::gateway::signature::{self, SignatureError};
use saumara_storefront::gateway::{GatewayError, PaymentGateway};

/// Secret shared by [`FakeGateway`] and the widgets that sign for it.
pub const TEST_SECRET: &str = "fake_secret_9f8e7d6c5b4a";

/// Public key the fake gateway hands to the widget.
pub const TEST_KEY_ID: &str = "rzp_test_fake";

/// Base URL for the live-server tests.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SAUMARA_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Fixtures
// =============================================================================

/// A catalog snapshot.
#[must_use]
pub fn snapshot(id: &str, price: u64) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        slug: Some(format!("product-{id}")),
        price: Rupees::new(price),
        category: Category::BathBody,
        image_url: String::new(),
    }
}

/// A cart line.
#[must_use]
pub fn line(id: &str, price: u64, quantity: u32) -> CartItem {
    CartItem {
        product: snapshot(id, price),
        quantity,
    }
}

/// A checkout form that passes validation.
#[must_use]
pub fn valid_form() -> CheckoutForm {
    CheckoutForm {
        name: "Ananya Rao".to_string(),
        email: "ananya@example.in".to_string(),
        phone: "+91 98450 12345".to_string(),
        address: "12 MG Road".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pincode: "560001".to_string(),
    }
}

// =============================================================================
// Order store
// =============================================================================

#[derive(Default)]
struct MemoryOrderStoreInner {
    orders: Mutex<Vec<Order>>,
    next_id: AtomicI32,
    forced_collisions: AtomicUsize,
    unavailable: AtomicBool,
    insert_attempts: AtomicUsize,
}

/// Order store backed by a `Vec`, with the same uniqueness rules as the
/// `orders` table.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    inner: Arc<MemoryOrderStoreInner>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the next `count` inserts as order-number collisions.
    pub fn collide_next(&self, count: usize) {
        self.inner.forced_collisions.store(count, Ordering::SeqCst);
    }

    /// Make every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        lock(&self.inner.orders).clone()
    }

    /// Every `insert_order` call, including rejected ones.
    #[must_use]
    pub fn insert_attempts(&self) -> usize {
        self.inner.insert_attempts.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

impl OrderStore for MemoryOrderStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        self.inner.insert_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let forced = self
            .inner
            .forced_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if forced.is_ok() {
            return Err(StoreError::DuplicateOrderNumber);
        }

        let mut orders = lock(&self.inner.orders);
        if orders.iter().any(|o| &o.razorpay_order_id == order.intent_id()) {
            return Err(StoreError::DuplicateIntent);
        }
        if orders.iter().any(|o| &o.order_number == order.order_number()) {
            return Err(StoreError::DuplicateOrderNumber);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let stored = order.clone().into_order(OrderId::new(id), Utc::now());
        orders.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.inner.orders)
            .iter()
            .find(|o| &o.order_number == order_number)
            .cloned())
    }

    async fn find_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.inner.orders)
            .iter()
            .find(|o| &o.razorpay_order_id == intent_id)
            .cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.inner.orders).iter().rev().cloned().collect())
    }
}

// =============================================================================
// Gateway
// =============================================================================

#[derive(Default)]
struct FakeGatewayInner {
    requests: Mutex<Vec<IntentRequest>>,
    amounts: Mutex<HashMap<IntentId, Paise>>,
    unavailable: AtomicBool,
}

/// Gateway that issues sequential intent ids, remembers what each one
/// charges, and verifies signatures with [`TEST_SECRET`].
#[derive(Clone, Default)]
pub struct FakeGateway {
    inner: Arc<FakeGatewayInner>,
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every API call fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every intent request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<IntentRequest> {
        lock(&self.inner.requests).clone()
    }

    /// A confirmation carrying a valid signature.
    #[must_use]
    pub fn confirm(intent_id: &IntentId, payment_id: &str) -> PaymentConfirmation {
        let signature =
            signature::sign(TEST_SECRET.as_bytes(), intent_id.as_str(), payment_id).unwrap_or_default();
        PaymentConfirmation {
            intent_id: intent_id.clone(),
            payment_id: PaymentId::new(payment_id),
            signature,
        }
    }
}

impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> Option<&str> {
        Some(TEST_KEY_ID)
    }

    async fn create_intent(&self, request: &IntentRequest) -> Result<IntentId, GatewayError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                message: "gateway down".to_string(),
            });
        }
        let mut requests = lock(&self.inner.requests);
        requests.push(request.clone());
        let intent_id = IntentId::new(format!("order_test_{}", requests.len()));
        lock(&self.inner.amounts).insert(intent_id.clone(), request.amount);
        Ok(intent_id)
    }

    async fn intent_amount(&self, intent_id: &IntentId) -> Result<Paise, GatewayError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                message: "gateway down".to_string(),
            });
        }
        lock(&self.inner.amounts)
            .get(intent_id)
            .copied()
            .ok_or_else(|| GatewayError::Api {
                status: 400,
                message: format!("no order {intent_id}"),
            })
    }

    fn verify(&self, confirmation: &PaymentConfirmation) -> Result<(), SignatureError> {
        signature::verify(
            TEST_SECRET.as_bytes(),
            confirmation.intent_id.as_str(),
            confirmation.payment_id.as_str(),
            &confirmation.signature,
        )
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Catalog with fixed, editable prices.
#[derive(Clone, Default)]
pub struct StaticCatalog {
    products: Arc<Mutex<HashMap<ProductId, ProductSnapshot>>>,
}

impl StaticCatalog {
    #[must_use]
    pub fn with(products: impl IntoIterator<Item = ProductSnapshot>) -> Self {
        let catalog = Self::default();
        lock(&catalog.products).extend(products.into_iter().map(|p| (p.id.clone(), p)));
        catalog
    }

    /// Change a product's price.
    pub fn set_price(&self, id: &str, price: u64) {
        if let Some(product) = lock(&self.products).get_mut(&ProductId::new(id)) {
            product.price = Rupees::new(price);
        }
    }
}

impl PriceCatalog for StaticCatalog {
    async fn snapshots(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, CatalogUnavailable> {
        let products = lock(&self.products);
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }
}

// =============================================================================
// Failure sink
// =============================================================================

/// Failure sink that keeps records in memory.
#[derive(Clone, Default)]
pub struct RecordingFailureSink {
    records: Arc<Mutex<Vec<PaymentFailure>>>,
}

impl RecordingFailureSink {
    #[must_use]
    pub fn records(&self) -> Vec<PaymentFailure> {
        lock(&self.records).clone()
    }
}

impl FailureSink for RecordingFailureSink {
    fn record(&self, failure: &PaymentFailure) -> Result<(), FailureLogError> {
        lock(&self.records).push(failure.clone());
        Ok(())
    }
}

// =============================================================================
// Widget
// =============================================================================

/// What the customer does in the widget.
#[derive(Debug, Clone)]
pub enum WidgetScript {
    /// Pay; the widget returns a correctly signed confirmation.
    Pay,
    /// Pay, but the confirmation carries this signature instead.
    PayWithSignature(String),
    /// Close the widget.
    Dismiss,
    /// The widget reports an error.
    Fail(String),
}

#[derive(Default)]
struct ScriptedWidgetInner {
    script: Mutex<VecDeque<WidgetScript>>,
    opened: Mutex<Vec<WidgetOptions>>,
}

/// Widget that plays back scripted customer actions. An exhausted script
/// behaves like a dismissal.
#[derive(Clone, Default)]
pub struct ScriptedWidget {
    inner: Arc<ScriptedWidgetInner>,
}

impl ScriptedWidget {
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = WidgetScript>) -> Self {
        let widget = Self::default();
        lock(&widget.inner.script).extend(script);
        widget
    }

    /// Queue another action.
    pub fn then(&self, action: WidgetScript) {
        lock(&self.inner.script).push_back(action);
    }

    /// Options the widget was opened with, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<WidgetOptions> {
        lock(&self.inner.opened).clone()
    }
}

impl GatewayWidget for ScriptedWidget {
    async fn open(&self, options: &WidgetOptions) -> WidgetOutcome {
        let count = {
            let mut opened = lock(&self.inner.opened);
            opened.push(options.clone());
            opened.len()
        };
        let payment_id = format!("pay_test_{count}");

        match lock(&self.inner.script).pop_front() {
            Some(WidgetScript::Pay) => {
                WidgetOutcome::Success(FakeGateway::confirm(&options.order_id, &payment_id))
            }
            Some(WidgetScript::PayWithSignature(signature)) => {
                WidgetOutcome::Success(PaymentConfirmation {
                    intent_id: options.order_id.clone(),
                    payment_id: PaymentId::new(payment_id),
                    signature,
                })
            }
            Some(WidgetScript::Fail(message)) => WidgetOutcome::Failed(message),
            Some(WidgetScript::Dismiss) | None => WidgetOutcome::Dismissed,
        }
    }
}

// =============================================================================
// Backend wrapper
// =============================================================================

#[derive(Default)]
struct Calls {
    intents: Mutex<Vec<Vec<CartItem>>>,
    orders: Mutex<Vec<OrderSubmission>>,
}

/// Records what the checkout flow sends to its backend.
#[derive(Clone)]
pub struct RecordingBackend<B> {
    backend: B,
    calls: Arc<Calls>,
}

impl<B> RecordingBackend<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            calls: Arc::default(),
        }
    }

    pub const fn inner(&self) -> &B {
        &self.backend
    }

    /// Number of `/api/razorpay` calls.
    #[must_use]
    pub fn intent_calls(&self) -> usize {
        lock(&self.calls.intents).len()
    }

    /// Every `/api/orders` submission.
    #[must_use]
    pub fn order_submissions(&self) -> Vec<OrderSubmission> {
        lock(&self.calls.orders).clone()
    }

    /// Total number of backend calls.
    #[must_use]
    pub fn network_calls(&self) -> usize {
        self.intent_calls().saturating_add(lock(&self.calls.orders).len())
    }
}

impl<B: CheckoutBackend> CheckoutBackend for RecordingBackend<B> {
    async fn request_intent(
        &self,
        items: &[CartItem],
        client_amount: Rupees,
    ) -> Result<CreatedIntent, CheckoutError> {
        lock(&self.calls.intents).push(items.to_vec());
        self.backend.request_intent(items, client_amount).await
    }

    async fn submit_order(&self, submission: OrderSubmission) -> Result<Order, CheckoutError> {
        lock(&self.calls.orders).push(submission.clone());
        self.backend.submit_order(submission).await
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Checkout wired to fakes.
pub type FakeCheckout = CheckoutService<FakeGateway, MemoryOrderStore, StaticCatalog>;

/// A service plus handles on every fake behind it.
pub struct Harness {
    pub gateway: FakeGateway,
    pub store: MemoryOrderStore,
    pub catalog: StaticCatalog,
    pub failures: RecordingFailureSink,
}

impl Harness {
    /// Fakes over a catalog of `products`.
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = ProductSnapshot>) -> Self {
        Self {
            gateway: FakeGateway::new(),
            store: MemoryOrderStore::new(),
            catalog: StaticCatalog::with(products),
            failures: RecordingFailureSink::default(),
        }
    }

    /// A service sharing this harness's fakes.
    #[must_use]
    pub fn service(&self) -> FakeCheckout {
        CheckoutService::new(
            self.gateway.clone(),
            self.store.clone(),
            self.catalog.clone(),
            Arc::new(self.failures.clone()),
        )
    }
}
