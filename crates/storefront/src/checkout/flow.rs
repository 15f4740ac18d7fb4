//! Client-side checkout state machine.
//!
//! ```text
//!  Idle ── submit(form) ──► Validating
//!  Validating      ── invalid / empty cart ──► Idle
//!  Validating      ── valid ──────────────────► CreatingIntent
//!  CreatingIntent  ── ok ─────────────────────► AwaitingGateway
//!  CreatingIntent  ── fail ───────────────────► Idle (toast)
//!  AwaitingGateway ── success(confirmation) ──► Persisting
//!  AwaitingGateway ── dismiss / error ────────► Idle
//!  Persisting      ── ok ─────────────────────► Done (cart cleared, redirect)
//!  Persisting      ── signature invalid ──────► Idle (toast)
//!  Persisting      ── fail ───────────────────► PaymentOrphaned
//! ```
//!
//! Only one attempt runs at a time: a `loading` latch turns concurrent
//! submits into [`CheckoutOutcome::Busy`]. The cart is cleared strictly after
//! the order is stored. A payment that was confirmed but not stored is kept
//! in cart storage under [`UNSETTLED_PAYMENT_KEY`], and the next submit (even
//! after a reload) persists it again instead of opening a new intent, so the
//! customer is never charged twice.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use saumara_core::{
    Cart, CartItem, CartStorage, CheckoutForm, IntentId, Order, OrderNumber, PaymentConfirmation,
    PaymentId, PriceBreakdown, Rupees, ValidationErrors,
};
use serde::{Deserialize, Serialize};

use super::service::{CheckoutService, CreatedIntent, OrderSubmission};
use super::widget::{WidgetOptions, WidgetOutcome};
use super::{CheckoutError, OrderStore, PriceCatalog};
use crate::gateway::PaymentGateway;

/// Shown instead of the form when the cart is empty.
pub const EMPTY_CART_MESSAGE: &str = "Your ritual is empty";

/// Where the empty-cart view sends the customer.
pub const EMPTY_CART_LINK: &str = "/collections/bath-body";

/// Order confirmation page.
pub const CONFIRMATION_PATH: &str = "/order-confirmation";

/// Storage key for a confirmed payment that has not become an order yet.
pub const UNSETTLED_PAYMENT_KEY: &str = "saumara-unsettled-payment";

/// The server half of checkout, as seen by the browser.
pub trait CheckoutBackend: Send + Sync {
    /// `POST /api/razorpay`
    fn request_intent(
        &self,
        items: &[CartItem],
        client_amount: Rupees,
    ) -> impl Future<Output = Result<CreatedIntent, CheckoutError>> + Send;

    /// `POST /api/orders`
    fn submit_order(
        &self,
        submission: OrderSubmission,
    ) -> impl Future<Output = Result<Order, CheckoutError>> + Send;
}

impl<G, S, C> CheckoutBackend for CheckoutService<G, S, C>
where
    G: PaymentGateway,
    S: OrderStore,
    C: PriceCatalog,
{
    async fn request_intent(
        &self,
        items: &[CartItem],
        client_amount: Rupees,
    ) -> Result<CreatedIntent, CheckoutError> {
        self.create_intent(items, Some(client_amount)).await
    }

    async fn submit_order(&self, submission: OrderSubmission) -> Result<Order, CheckoutError> {
        self.place_order(submission).await.map(|placed| placed.order)
    }
}

/// The gateway's browser widget. Opening it is the single suspension point
/// that hands control to the customer.
pub trait GatewayWidget: Send + Sync {
    fn open(&self, options: &WidgetOptions) -> impl Future<Output = WidgetOutcome> + Send;
}

/// Where one checkout attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Validating,
    CreatingIntent,
    AwaitingGateway {
        intent_id: IntentId,
    },
    Persisting {
        intent_id: IntentId,
        payment_id: PaymentId,
    },
    Done {
        order_number: OrderNumber,
    },
    PaymentOrphaned {
        intent_id: IntentId,
        payment_id: PaymentId,
    },
}

/// What the UI should do after a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Another attempt is in flight; the submit button is disabled.
    Busy,
    /// Show the empty-cart view.
    EmptyCart,
    /// Highlight the failing fields.
    Invalid(ValidationErrors),
    /// The customer closed the widget. Nothing to show.
    Dismissed,
    /// Show a toast; the cart is untouched.
    Failed(CheckoutError),
    /// Charged but not recorded. Show the payment id and keep the cart.
    Orphaned {
        intent_id: IntentId,
        payment_id: PaymentId,
        error: CheckoutError,
    },
    /// Navigate to `redirect`.
    Completed {
        order_number: OrderNumber,
        redirect: String,
    },
}

impl CheckoutOutcome {
    /// Toast text, if this outcome needs one.
    #[must_use]
    pub fn toast(&self) -> Option<String> {
        match self {
            Self::Failed(CheckoutError::GatewayUnavailable(_)) => {
                Some("Payment gateway unreachable. Please try again.".to_string())
            }
            Self::Failed(CheckoutError::SignatureInvalid) => Some(
                "We could not verify your payment. Please contact support before retrying."
                    .to_string(),
            ),
            Self::Failed(err) => Some(err.to_string()),
            Self::Orphaned { payment_id, .. } => Some(format!(
                "Your payment {payment_id} was received but your order could not be recorded. \
                 Please contact support with this payment id. Retrying will not charge you again."
            )),
            _ => None,
        }
    }
}

/// A confirmed payment that has not become an order yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnsettledPayment {
    confirmation: PaymentConfirmation,
    items: Vec<CartItem>,
}

/// Releases the loading latch when the attempt ends, however it ends.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One browser's checkout.
pub struct CheckoutFlow<B, W, S> {
    backend: B,
    widget: W,
    cart: Mutex<Cart<S>>,
    loading: AtomicBool,
    state: Mutex<CheckoutState>,
    history: Mutex<Vec<CheckoutState>>,
    unsettled: Mutex<Option<UnsettledPayment>>,
}

impl<B, W, S> CheckoutFlow<B, W, S>
where
    B: CheckoutBackend,
    W: GatewayWidget,
    S: CartStorage + Send,
{
    /// Start a checkout over `cart`, picking up any payment a previous
    /// session left unsettled in the same storage.
    pub fn new(backend: B, widget: W, cart: Cart<S>) -> Self {
        let unsettled = cart
            .storage()
            .read(UNSETTLED_PAYMENT_KEY)
            .and_then(|raw| serde_json::from_str::<Option<UnsettledPayment>>(&raw).ok())
            .flatten();
        if let Some(payment) = &unsettled {
            tracing::warn!(
                correlation_id = %payment.confirmation.intent_id,
                payment_id = %payment.confirmation.payment_id,
                "Restored a confirmed payment that was never stored"
            );
        }
        Self {
            backend,
            widget,
            cart: Mutex::new(cart),
            loading: AtomicBool::new(false),
            state: Mutex::new(CheckoutState::Idle),
            history: Mutex::new(Vec::new()),
            unsettled: Mutex::new(unsettled),
        }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn widget(&self) -> &W {
        &self.widget
    }

    /// Run `f` against the cart (UI mutations, reads).
    pub fn with_cart<R>(&self, f: impl FnOnce(&mut Cart<S>) -> R) -> R {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }

    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every state entered so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<CheckoutState> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an attempt is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Whether a confirmed payment is waiting to be stored.
    #[must_use]
    pub fn has_unsettled_payment(&self) -> bool {
        self.unsettled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run one checkout attempt.
    pub async fn submit(&self, form: &CheckoutForm) -> CheckoutOutcome {
        let Some(_guard) = self.begin() else {
            return CheckoutOutcome::Busy;
        };

        self.transition(CheckoutState::Validating);
        let (items, client_total) = self.with_cart(|cart| (cart.items().to_vec(), cart.price().total));

        if items.is_empty() {
            self.transition(CheckoutState::Idle);
            return CheckoutOutcome::EmptyCart;
        }
        let customer = match form.validate() {
            Ok(customer) => customer,
            Err(errors) => {
                self.transition(CheckoutState::Idle);
                return CheckoutOutcome::Invalid(errors);
            }
        };

        if let Some(unsettled) = self.take_unsettled() {
            tracing::info!(
                correlation_id = %unsettled.confirmation.intent_id,
                "Retrying storage of an already confirmed payment"
            );
            return self
                .persist(form, unsettled.items, unsettled.confirmation)
                .await;
        }

        self.transition(CheckoutState::CreatingIntent);
        let created = match self.backend.request_intent(&items, client_total).await {
            Ok(created) => created,
            Err(CheckoutError::EmptyCart) => {
                self.transition(CheckoutState::Idle);
                return CheckoutOutcome::EmptyCart;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Could not create payment intent");
                self.transition(CheckoutState::Idle);
                return CheckoutOutcome::Failed(err);
            }
        };

        let intent_id = created.intent.intent_id.clone();
        self.transition(CheckoutState::AwaitingGateway {
            intent_id: intent_id.clone(),
        });

        let options = WidgetOptions::new(
            created.key_id.as_deref().unwrap_or_default(),
            created.intent.amount_paise,
            intent_id.clone(),
            &customer,
        );

        match self.widget.open(&options).await {
            WidgetOutcome::Success(confirmation) => self.persist(form, items, confirmation).await,
            WidgetOutcome::Dismissed => {
                tracing::info!(correlation_id = %intent_id, "Gateway widget dismissed");
                self.transition(CheckoutState::Idle);
                CheckoutOutcome::Dismissed
            }
            WidgetOutcome::Failed(message) => {
                tracing::warn!(correlation_id = %intent_id, error = %message, "Gateway widget failed");
                self.transition(CheckoutState::Idle);
                CheckoutOutcome::Failed(CheckoutError::GatewayUnavailable(message))
            }
        }
    }

    async fn persist(
        &self,
        form: &CheckoutForm,
        items: Vec<CartItem>,
        confirmation: PaymentConfirmation,
    ) -> CheckoutOutcome {
        self.transition(CheckoutState::Persisting {
            intent_id: confirmation.intent_id.clone(),
            payment_id: confirmation.payment_id.clone(),
        });

        let client_totals = Some(PriceBreakdown::for_items(&items));
        let submission = OrderSubmission {
            form: form.clone(),
            items: items.clone(),
            confirmation: confirmation.clone(),
            client_totals,
        };

        match self.backend.submit_order(submission).await {
            Ok(order) => {
                self.save_unsettled(None);
                if let Err(e) = self.with_cart(Cart::clear) {
                    tracing::warn!(
                        correlation_id = %order.order_number,
                        error = %e,
                        "Order stored but cart could not be cleared from storage"
                    );
                }
                tracing::info!(correlation_id = %order.order_number, "Checkout complete");
                let redirect = format!("{CONFIRMATION_PATH}?order={}", order.order_number);
                self.transition(CheckoutState::Done {
                    order_number: order.order_number.clone(),
                });
                CheckoutOutcome::Completed {
                    order_number: order.order_number,
                    redirect,
                }
            }
            Err(CheckoutError::SignatureInvalid) => {
                tracing::error!(
                    correlation_id = %confirmation.intent_id,
                    payment_id = %confirmation.payment_id,
                    "Payment signature rejected by server"
                );
                self.save_unsettled(None);
                self.transition(CheckoutState::Idle);
                CheckoutOutcome::Failed(CheckoutError::SignatureInvalid)
            }
            Err(error) => {
                tracing::error!(
                    correlation_id = %confirmation.intent_id,
                    payment_id = %confirmation.payment_id,
                    %error,
                    "Payment confirmed but order not stored"
                );
                let intent_id = confirmation.intent_id.clone();
                let payment_id = confirmation.payment_id.clone();
                let payment = UnsettledPayment {
                    confirmation,
                    items,
                };
                self.save_unsettled(Some(&payment));
                *self.unsettled.lock().unwrap_or_else(PoisonError::into_inner) = Some(payment);
                self.transition(CheckoutState::PaymentOrphaned {
                    intent_id: intent_id.clone(),
                    payment_id: payment_id.clone(),
                });
                CheckoutOutcome::Orphaned {
                    intent_id,
                    payment_id,
                    error,
                }
            }
        }
    }

    fn begin(&self) -> Option<LoadingGuard<'_>> {
        self.loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadingGuard(&self.loading))
    }

    fn take_unsettled(&self) -> Option<UnsettledPayment> {
        self.unsettled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Mirror the unsettled payment into storage so a reload cannot lose it.
    fn save_unsettled(&self, payment: Option<&UnsettledPayment>) {
        let value = match serde_json::to_string(&payment) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Could not encode unsettled payment");
                return;
            }
        };
        if let Err(e) = self.with_cart(|cart| cart.storage().write(UNSETTLED_PAYMENT_KEY, &value)) {
            tracing::warn!(error = %e, "Could not save unsettled payment");
        }
    }

    fn transition(&self, next: CheckoutState) {
        tracing::debug!(state = ?next, "Checkout state");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(next.clone());
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
