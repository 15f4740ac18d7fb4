//! The checkout transaction pipeline.
//!
//! # Server half
//!
//! [`CheckoutService`] creates payment intents for server-priced carts and
//! turns verified gateway confirmations into orders:
//!
//! ```text
//! create_intent: reprice cart -> gateway.create_intent(total × 100, INR)
//! place_order:   verify signature -> validate -> dedup by intent
//!                -> reprice -> match the intent's charged amount
//!                -> insert (regenerating the order number on conflict)
//!
//! Every rejection after a good signature goes to the failure sink.
//! ```
//!
//! # Client half
//!
//! [`CheckoutFlow`] is the per-browser state machine that sequences form
//! validation, intent creation, the gateway widget, order persistence and
//! cart clearing. It talks to the server through a [`CheckoutBackend`],
//! either in process ([`CheckoutService`]) or over HTTP ([`HttpCheckoutBackend`]).

pub mod client;
pub mod failures;
pub mod flow;
pub mod service;
pub mod storage;
pub mod widget;
pub mod wire;

use std::future::Future;

use saumara_core::{
    IntentId, NewOrder, Order, OrderNumber, ProductId, ProductSnapshot, ValidationErrors,
};
use thiserror::Error;

pub use client::HttpCheckoutBackend;
pub use failures::{FailureSink, JsonlFailureLog};
pub use flow::{
    CheckoutBackend, CheckoutFlow, CheckoutOutcome, CheckoutState, GatewayWidget,
    UNSETTLED_PAYMENT_KEY,
};
pub use service::{CheckoutService, CreatedIntent, OrderSubmission, PlacedOrder};
pub use storage::JsonFileStorage;
pub use widget::{WidgetOptions, WidgetOutcome};

/// Port-level order store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another order already uses this order number.
    #[error("order number already exists")]
    DuplicateOrderNumber,
    /// An order for this payment intent already exists.
    #[error("order already exists for this payment intent")]
    DuplicateIntent,
    /// The store could not be reached.
    #[error("order store unavailable: {0}")]
    Unavailable(String),
    /// A stored record could not be decoded.
    #[error("corrupt order record: {0}")]
    Corrupt(String),
}

/// Append-only order persistence.
pub trait OrderStore: Send + Sync {
    /// Insert a new order. Never updates an existing record.
    fn insert_order(&self, order: &NewOrder) -> impl Future<Output = Result<Order, StoreError>> + Send;

    fn find_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;

    fn find_by_intent(
        &self,
        intent_id: &IntentId,
    ) -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;

    /// All orders, newest first.
    fn list_orders(&self) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;
}

/// Catalog lookup failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("catalog unavailable: {0}")]
pub struct CatalogUnavailable(pub String);

/// Fresh catalog prices for repricing carts.
pub trait PriceCatalog: Send + Sync {
    /// Current snapshots for the given ids. Unknown ids are simply absent.
    fn snapshots(
        &self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<Vec<ProductSnapshot>, CatalogUnavailable>> + Send;
}

/// Checkout failures, as surfaced to the customer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Form fields missing or malformed.
    #[error("{0}")]
    Validation(ValidationErrors),
    /// Nothing to check out.
    #[error("Your ritual is empty")]
    EmptyCart,
    /// A cart line references a product the catalog does not know.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),
    /// Intent creation failed or the gateway could not be reached.
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    /// The customer closed the gateway widget.
    #[error("payment cancelled")]
    GatewayDismissed,
    /// The returned payment signature did not verify.
    #[error("payment could not be verified")]
    SignatureInvalid,
    /// The repriced order total is not what the intent charged.
    #[error("order total does not match the amount paid: {0}")]
    AmountMismatch(String),
    /// Order-number regeneration was exhausted.
    #[error("could not allocate a unique order number")]
    DuplicateOrderNumber,
    /// The charge succeeded but the order could not be stored.
    #[error("order store unavailable: {0}")]
    StoreUnavailable(String),
    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Stable machine-readable code used on the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::EmptyCart => "empty_cart",
            Self::UnknownProduct(_) => "unknown_product",
            Self::GatewayUnavailable(_) => "gateway_unavailable",
            Self::GatewayDismissed => "gateway_dismissed",
            Self::SignatureInvalid => "signature_invalid",
            Self::AmountMismatch(_) => "amount_mismatch",
            Self::DuplicateOrderNumber => "duplicate_order_number",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Rebuild an error from its wire form.
    #[must_use]
    pub fn from_code(code: &str, message: String, fields: Option<ValidationErrors>) -> Self {
        match code {
            "validation" => Self::Validation(fields.unwrap_or_default()),
            "empty_cart" => Self::EmptyCart,
            "unknown_product" => {
                Self::UnknownProduct(ProductId::new(detail(message, "unknown product: ")))
            }
            "gateway_unavailable" => {
                Self::GatewayUnavailable(detail(message, "payment gateway unavailable: "))
            }
            "gateway_dismissed" => Self::GatewayDismissed,
            "signature_invalid" => Self::SignatureInvalid,
            "amount_mismatch" => Self::AmountMismatch(detail(
                message,
                "order total does not match the amount paid: ",
            )),
            "duplicate_order_number" => Self::DuplicateOrderNumber,
            "store_unavailable" => {
                Self::StoreUnavailable(detail(message, "order store unavailable: "))
            }
            _ => Self::Internal(detail(message, "internal error: ")),
        }
    }
}

/// `message` without the prefix its own `Display` adds.
fn detail(message: String, prefix: &str) -> String {
    match message.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => message,
    }
}
