//! Orders, payment intents and payment confirmations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::{CheckoutForm, DeliveryAddress, ShippingAddress};
use super::email::Email;
use super::id::{IntentId, OrderId, PaymentId};
use super::order_number::OrderNumber;
use super::price::{CurrencyCode, Paise, PriceBreakdown, Rupees};
use super::product::CartItem;
use super::status::OrderStatus;

/// A persisted order.
///
/// Orders are append-only: once written they are never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: String,
    pub shipping_address: DeliveryAddress,
    pub items: Vec<CartItem>,
    pub subtotal: Rupees,
    pub shipping: Rupees,
    pub total: Rupees,
    pub status: OrderStatus,
    pub razorpay_order_id: IntentId,
    pub razorpay_payment_id: PaymentId,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Totals as a [`PriceBreakdown`].
    #[must_use]
    pub const fn breakdown(&self) -> PriceBreakdown {
        PriceBreakdown {
            subtotal: self.subtotal,
            shipping: self.shipping,
            total: self.total,
        }
    }

    /// Whether the stored totals agree with the price policy applied to the
    /// stored items.
    #[must_use]
    pub fn totals_consistent(&self) -> bool {
        PriceBreakdown::for_items(&self.items) == self.breakdown()
    }

    /// Total items across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }
}

/// An order ready to be inserted.
///
/// Totals are always derived from `items`, so a `NewOrder` cannot carry
/// figures that disagree with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    order_number: OrderNumber,
    customer: ShippingAddress,
    items: Vec<CartItem>,
    breakdown: PriceBreakdown,
    intent_id: IntentId,
    payment_id: PaymentId,
}

impl NewOrder {
    #[must_use]
    pub fn new(
        order_number: OrderNumber,
        customer: ShippingAddress,
        items: Vec<CartItem>,
        intent_id: IntentId,
        payment_id: PaymentId,
    ) -> Self {
        let breakdown = PriceBreakdown::for_items(&items);
        Self {
            order_number,
            customer,
            items,
            breakdown,
            intent_id,
            payment_id,
        }
    }

    /// Replace the order number after a uniqueness conflict.
    #[must_use]
    pub fn with_order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = order_number;
        self
    }

    #[must_use]
    pub const fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    #[must_use]
    pub const fn customer(&self) -> &ShippingAddress {
        &self.customer
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub const fn breakdown(&self) -> PriceBreakdown {
        self.breakdown
    }

    #[must_use]
    pub const fn intent_id(&self) -> &IntentId {
        &self.intent_id
    }

    #[must_use]
    pub const fn payment_id(&self) -> &PaymentId {
        &self.payment_id
    }

    /// Materialize the stored record once the store has assigned an id and
    /// timestamp.
    #[must_use]
    pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            order_number: self.order_number,
            customer_name: self.customer.name,
            customer_email: self.customer.email,
            customer_phone: self.customer.phone,
            shipping_address: self.customer.delivery,
            items: self.items,
            subtotal: self.breakdown.subtotal,
            shipping: self.breakdown.shipping,
            total: self.breakdown.total,
            status: OrderStatus::Confirmed,
            razorpay_order_id: self.intent_id,
            razorpay_payment_id: self.payment_id,
            created_at,
        }
    }
}

/// Parameters for creating a gateway payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRequest {
    pub amount: Paise,
    pub currency: CurrencyCode,
    pub receipt: String,
}

impl IntentRequest {
    /// Build a request charging `total`, with a `receipt_<unixMs>` receipt.
    #[must_use]
    pub fn for_total(total: Rupees, unix_ms: i64) -> Self {
        Self {
            amount: total.to_paise(),
            currency: CurrencyCode::INR,
            receipt: format!("receipt_{unix_ms}"),
        }
    }
}

/// A gateway-issued payment intent, handed to the client widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub intent_id: IntentId,
    pub amount_paise: Paise,
    pub currency: CurrencyCode,
    pub receipt: String,
}

/// What the gateway widget hands back after a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(rename = "razorpay_order_id")]
    pub intent_id: IntentId,
    #[serde(rename = "razorpay_payment_id")]
    pub payment_id: PaymentId,
    #[serde(rename = "razorpay_signature")]
    pub signature: String,
}

/// A charge that could not be turned into an order, kept for manual
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailure {
    pub recorded_at: DateTime<Utc>,
    pub intent_id: IntentId,
    pub payment_id: PaymentId,
    pub customer: CheckoutForm,
    pub items: Vec<CartItem>,
    pub subtotal: Rupees,
    pub shipping: Rupees,
    pub total: Rupees,
    pub error: String,
}

impl PaymentFailure {
    /// Build a record for a verified payment whose order was not stored.
    #[must_use]
    pub fn new(
        intent_id: IntentId,
        payment_id: PaymentId,
        customer: CheckoutForm,
        items: Vec<CartItem>,
        error: impl Into<String>,
    ) -> Self {
        let breakdown = PriceBreakdown::for_items(&items);
        Self {
            recorded_at: Utc::now(),
            intent_id,
            payment_id,
            customer,
            items,
            subtotal: breakdown.subtotal,
            shipping: breakdown.shipping,
            total: breakdown.total,
            error: error.into(),
        }
    }
}
