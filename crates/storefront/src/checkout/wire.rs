//! JSON bodies for `/api/razorpay` and `/api/orders`.
//!
//! Shared by the route handlers and [`HttpCheckoutBackend`](super::HttpCheckoutBackend)
//! so both ends agree on field names.

use saumara_core::{
    CartItem, CheckoutForm, CurrencyCode, IntentId, Order, OrderNumber, Paise, PaymentConfirmation,
    PaymentId, PaymentIntent, PriceBreakdown, Rupees, ValidationErrors,
};
use serde::{Deserialize, Serialize};

use super::service::{CreatedIntent, OrderSubmission};
use super::CheckoutError;

/// `POST /api/razorpay` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentBody {
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// What the browser believes the total is, in rupees.
    #[serde(default)]
    pub amount: Option<Rupees>,
}

/// `POST /api/razorpay` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub order_id: IntentId,
    /// Paise.
    pub amount: Paise,
    pub currency: CurrencyCode,
    pub receipt: String,
    pub key: Option<String>,
    pub subtotal: Rupees,
    pub shipping: Rupees,
    pub total: Rupees,
    pub items: Vec<CartItem>,
}

impl From<CreatedIntent> for IntentResponse {
    fn from(created: CreatedIntent) -> Self {
        Self {
            order_id: created.intent.intent_id,
            amount: created.intent.amount_paise,
            currency: created.intent.currency,
            receipt: created.intent.receipt,
            key: created.key_id,
            subtotal: created.breakdown.subtotal,
            shipping: created.breakdown.shipping,
            total: created.breakdown.total,
            items: created.items,
        }
    }
}

impl From<IntentResponse> for CreatedIntent {
    fn from(response: IntentResponse) -> Self {
        Self {
            intent: PaymentIntent {
                intent_id: response.order_id,
                amount_paise: response.amount,
                currency: response.currency,
                receipt: response.receipt,
            },
            breakdown: PriceBreakdown {
                subtotal: response.subtotal,
                shipping: response.shipping,
                total: response.total,
            },
            items: response.items,
            key_id: response.key,
        }
    }
}

/// `shippingAddress` as the browser sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressBody {
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// `POST /api/orders` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub shipping_address: AddressBody,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub subtotal: Option<Rupees>,
    pub shipping: Option<Rupees>,
    pub total: Option<Rupees>,
    pub razorpay_order_id: IntentId,
    pub razorpay_payment_id: PaymentId,
    #[serde(default)]
    pub razorpay_signature: String,
}

impl From<&OrderSubmission> for OrderBody {
    fn from(submission: &OrderSubmission) -> Self {
        let form = &submission.form;
        let totals = submission.client_totals;
        Self {
            customer_name: form.name.clone(),
            customer_email: form.email.clone(),
            customer_phone: form.phone.clone(),
            shipping_address: AddressBody {
                address: form.address.clone(),
                city: form.city.clone(),
                state: form.state.clone(),
                pincode: form.pincode.clone(),
            },
            items: submission.items.clone(),
            subtotal: totals.map(|t| t.subtotal),
            shipping: totals.map(|t| t.shipping),
            total: totals.map(|t| t.total),
            razorpay_order_id: submission.confirmation.intent_id.clone(),
            razorpay_payment_id: submission.confirmation.payment_id.clone(),
            razorpay_signature: submission.confirmation.signature.clone(),
        }
    }
}

impl From<OrderBody> for OrderSubmission {
    fn from(body: OrderBody) -> Self {
        let client_totals = match (body.subtotal, body.shipping, body.total) {
            (Some(subtotal), Some(shipping), Some(total)) => Some(PriceBreakdown {
                subtotal,
                shipping,
                total,
            }),
            _ => None,
        };
        Self {
            form: CheckoutForm {
                name: body.customer_name,
                email: body.customer_email,
                phone: body.customer_phone,
                address: body.shipping_address.address,
                city: body.shipping_address.city,
                state: body.shipping_address.state,
                pincode: body.shipping_address.pincode,
            },
            items: body.items,
            confirmation: PaymentConfirmation {
                intent_id: body.razorpay_order_id,
                payment_id: body.razorpay_payment_id,
                signature: body.razorpay_signature,
            },
            client_totals,
        }
    }
}

/// `POST /api/orders` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedResponse {
    pub order: Order,
    pub order_number: OrderNumber,
}

/// `GET /api/orders?orderNumber=` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
}

/// `GET /api/orders` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

/// Error body returned by every API route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

impl ErrorBody {
    #[must_use]
    pub fn into_checkout_error(self) -> CheckoutError {
        CheckoutError::from_code(&self.code, self.error, self.fields)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_order_body_accepts_storefront_payload() {
        let body: OrderBody = serde_json::from_value(json!({
            "customerName": "Ishaan Mehta",
            "customerEmail": "ishaan@example.in",
            "customerPhone": "9820012345",
            "shippingAddress": {
                "address": "7 Linking Road",
                "city": "Mumbai",
                "state": "Maharashtra",
                "pincode": "400050"
            },
            "items": [{
                "product": {"id": "p1", "name": "Rose Body Oil", "price": 1500, "category": "bath-body"},
                "quantity": 2
            }],
            "subtotal": 3000,
            "shipping": 199,
            "total": 3199,
            "razorpayOrderId": "order_N1",
            "razorpayPaymentId": "pay_N1",
            "razorpaySignature": "deadbeef"
        }))
        .unwrap();

        let submission = OrderSubmission::from(body);
        assert_eq!(submission.form.state, "Maharashtra");
        assert_eq!(submission.confirmation.signature, "deadbeef");
        assert_eq!(submission.client_totals.unwrap().total, Rupees::new(3199));
        assert!(submission.form.validate().is_ok());
    }

    #[test]
    fn test_partial_client_totals_are_dropped() {
        let body: OrderBody = serde_json::from_value(json!({
            "total": 3199,
            "razorpayOrderId": "order_N1",
            "razorpayPaymentId": "pay_N1"
        }))
        .unwrap();
        let submission = OrderSubmission::from(body);
        assert!(submission.client_totals.is_none());
        assert!(submission.confirmation.signature.is_empty());
    }

    #[test]
    fn test_error_body_maps_back_to_checkout_error() {
        let body: ErrorBody =
            serde_json::from_value(json!({"error": "payment could not be verified", "code": "signature_invalid"}))
                .unwrap();
        assert_eq!(body.into_checkout_error(), CheckoutError::SignatureInvalid);
    }
}
