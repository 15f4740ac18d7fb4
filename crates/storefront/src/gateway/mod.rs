//! Payment gateway port and the Razorpay adapter.
//!
//! A gateway creates payment intents and verifies the signed callback the
//! browser widget returns after payment. Before an order is stored the
//! pipeline also asks it what the paid intent actually charged.

pub mod razorpay;
pub mod signature;

use std::future::Future;

use saumara_core::{IntentId, IntentRequest, Paise, PaymentConfirmation};
use thiserror::Error;

pub use razorpay::RazorpayClient;
pub use signature::SignatureError;

/// Errors that can occur when talking to the gateway API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No API credentials are configured.
    #[error("gateway credentials not configured")]
    MissingCredentials,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A payment gateway.
pub trait PaymentGateway: Send + Sync {
    /// Public key handed to the browser widget, if configured.
    fn key_id(&self) -> Option<&str>;

    /// Create a payment intent and return the gateway's id for it.
    fn create_intent(
        &self,
        request: &IntentRequest,
    ) -> impl Future<Output = Result<IntentId, GatewayError>> + Send;

    /// The amount the gateway charges for an intent it issued.
    fn intent_amount(
        &self,
        intent_id: &IntentId,
    ) -> impl Future<Output = Result<Paise, GatewayError>> + Send;

    /// Check the signature on a widget callback.
    ///
    /// # Errors
    ///
    /// Returns the reason the confirmation could not be trusted.
    fn verify(&self, confirmation: &PaymentConfirmation) -> Result<(), SignatureError>;
}
