//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, tagged in Sentry, echoed back)
//! 4. Security headers (CSP that admits the Razorpay widget)
//! 5. Rate limiting on `/api` only (governor)

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use rate_limit::checkout_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
