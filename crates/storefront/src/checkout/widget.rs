//! Options for, and outcomes of, the Razorpay checkout widget.

use saumara_core::{IntentId, Paise, PaymentConfirmation, ShippingAddress};
use serde::{Deserialize, Serialize};

/// Merchant name shown in the widget header.
pub const MERCHANT_NAME: &str = "Saumara";

/// Tagline shown under the merchant name.
pub const MERCHANT_DESCRIPTION: &str = "Rituals for the Mindful Self";

/// Brand colour applied to the widget.
pub const THEME_COLOR: &str = "#1C3A2E";

/// Checkout script served by the gateway CDN.
pub const CHECKOUT_SCRIPT_URL: &str = "https://checkout.razorpay.com/v1/checkout.js";

/// Options passed to `new Razorpay(options)`.
///
/// The `handler` and `modal.ondismiss` callbacks are attached in the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetOptions {
    pub key: String,
    pub amount: Paise,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: IntentId,
    pub prefill: Prefill,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub color: String,
}

impl WidgetOptions {
    #[must_use]
    pub fn new(key: &str, amount: Paise, order_id: IntentId, customer: &ShippingAddress) -> Self {
        Self {
            key: key.to_string(),
            amount,
            currency: "INR".to_string(),
            name: MERCHANT_NAME.to_string(),
            description: MERCHANT_DESCRIPTION.to_string(),
            order_id,
            prefill: Prefill {
                name: customer.name.clone(),
                email: customer.email.to_string(),
                contact: customer.phone.clone(),
            },
            theme: Theme {
                color: THEME_COLOR.to_string(),
            },
        }
    }
}

/// How the widget resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetOutcome {
    /// `handler` fired with the signed confirmation.
    Success(PaymentConfirmation),
    /// `modal.ondismiss` fired.
    Dismissed,
    /// The script failed to load or reported a payment failure.
    Failed(String),
}
