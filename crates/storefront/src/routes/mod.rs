//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page (bestsellers)
//! GET  /about                         - Brand story
//! GET  /collections/{category}        - Collection page (?sort=, ?sub=)
//! GET  /products/{slug}               - Product detail
//! GET  /checkout                      - Checkout form
//! GET  /order-confirmation            - Confirmation (?order=)
//!
//! # API (rate limited)
//! POST /api/razorpay                  - Reprice cart and create payment intent
//! POST /api/orders                    - Verify payment and place order
//! GET  /api/orders                    - All orders, or one with ?orderNumber=
//! GET  /api/products                  - ?slug= or ?category=&bestseller=&limit=
//! ```

pub mod about;
pub mod api;
pub mod checkout;
pub mod collections;
pub mod home;
pub mod products;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::filters;
use crate::middleware::checkout_rate_limiter;
use crate::state::AppState;

/// Page shown for unknown slugs and categories.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub message: String,
}

/// Render the 404 page.
#[must_use]
pub fn not_found(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            message: message.into(),
        },
    )
        .into_response()
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/razorpay", post(api::razorpay::create_intent))
        .route("/orders", post(api::orders::create).get(api::orders::index))
        .route("/products", get(api::products::index));

    match checkout_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => {
            tracing::warn!("Rate limiter configuration rejected, API is unlimited");
            router
        }
    }
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/about", get(about::about))
        .route("/collections/{category}", get(collections::show))
        .route("/products/{slug}", get(products::show))
        .route("/checkout", get(checkout::checkout_page))
        .route("/order-confirmation", get(checkout::confirmation_page))
        .nest("/api", api_routes())
        .fallback(|| async { not_found("This page could not be found.") })
}
