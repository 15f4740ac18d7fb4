//! Checkout and order confirmation pages.
//!
//! The cart lives in the browser, so the checkout page renders both the
//! form and the empty-ritual view; `checkout.js` shows whichever applies and
//! drives the payment widget against `/api/razorpay` and `/api/orders`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use saumara_core::{
    FLAT_SHIPPING, FREE_SHIPPING_THRESHOLD, IndianState, Order, OrderNumber,
    cart::CART_STORAGE_KEY,
};

use crate::checkout::flow::{
    CONFIRMATION_PATH, EMPTY_CART_LINK, EMPTY_CART_MESSAGE, UNSETTLED_PAYMENT_KEY,
};
use crate::checkout::widget::{CHECKOUT_SCRIPT_URL, MERCHANT_DESCRIPTION, MERCHANT_NAME, THEME_COLOR};
use crate::filters;
use crate::state::AppState;

/// Shown when the confirmation page is opened without an order number.
pub const PLACEHOLDER_ORDER_NUMBER: &str = "SAU-XXXXX";

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub states: Vec<&'static str>,
    /// Public gateway key; absent when payments are not configured.
    pub razorpay_key: String,
    pub checkout_script: &'static str,
    pub merchant_name: &'static str,
    pub merchant_description: &'static str,
    pub theme_color: &'static str,
    pub cart_key: &'static str,
    pub unsettled_key: &'static str,
    pub confirmation_path: &'static str,
    pub empty_message: &'static str,
    pub empty_link: &'static str,
    pub free_shipping_threshold: u64,
    pub flat_shipping: u64,
}

/// Display the checkout form.
#[instrument(skip(state))]
pub async fn checkout_page(State(state): State<AppState>) -> impl IntoResponse {
    CheckoutTemplate {
        states: IndianState::ALL.into_iter().map(IndianState::name).collect(),
        razorpay_key: state.config().razorpay.key_id.clone().unwrap_or_default(),
        checkout_script: CHECKOUT_SCRIPT_URL,
        merchant_name: MERCHANT_NAME,
        merchant_description: MERCHANT_DESCRIPTION,
        theme_color: THEME_COLOR,
        cart_key: CART_STORAGE_KEY,
        unsettled_key: UNSETTLED_PAYMENT_KEY,
        confirmation_path: CONFIRMATION_PATH,
        empty_message: EMPTY_CART_MESSAGE,
        empty_link: EMPTY_CART_LINK,
        free_shipping_threshold: FREE_SHIPPING_THRESHOLD.get(),
        flat_shipping: FLAT_SHIPPING.get(),
    }
}

/// Confirmation query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmationQuery {
    pub order: Option<String>,
}

/// Order summary shown on the confirmation page when the order is found.
pub struct OrderSummary {
    pub customer_name: String,
    pub item_count: u32,
    pub subtotal: String,
    pub shipping: String,
    pub ships_free: bool,
    pub total: String,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        let breakdown = order.breakdown();
        Self {
            customer_name: order.customer_name.clone(),
            item_count: order.item_count(),
            subtotal: breakdown.subtotal.to_string(),
            shipping: breakdown.shipping.to_string(),
            ships_free: breakdown.ships_free(),
            total: breakdown.total.to_string(),
        }
    }
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "order_confirmation.html")]
pub struct ConfirmationTemplate {
    pub order_number: String,
    pub summary: Option<OrderSummary>,
    pub cart_key: &'static str,
}

/// Display the confirmation for `?order=`.
///
/// The order number is shown even when the lookup fails; the payment has
/// already been taken by the time the customer lands here.
#[instrument(skip(state))]
pub async fn confirmation_page(
    State(state): State<AppState>,
    Query(query): Query<ConfirmationQuery>,
) -> impl IntoResponse {
    let requested = query
        .order
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let summary = match requested.map(OrderNumber::parse) {
        Some(Ok(number)) => match state.checkout().find_order(&number).await {
            Ok(order) => order.as_ref().map(OrderSummary::from),
            Err(e) => {
                tracing::warn!(correlation_id = %number, error = %e, "Order lookup failed on confirmation page");
                None
            }
        },
        _ => None,
    };

    ConfirmationTemplate {
        order_number: requested.unwrap_or(PLACEHOLDER_ORDER_NUMBER).to_string(),
        summary,
        cart_key: CART_STORAGE_KEY,
    }
}
