//! Core types for Saumara.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod order;
pub mod order_number;
pub mod price;
pub mod product;
pub mod status;

pub use address::{
    CheckoutForm, DeliveryAddress, FieldError, IndianState, Pincode, ShippingAddress,
    ValidationErrors,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{IntentRequest, NewOrder, Order, PaymentConfirmation, PaymentFailure, PaymentIntent};
pub use order_number::{OrderNumber, OrderNumberError};
pub use price::{
    CurrencyCode, FLAT_SHIPPING, FREE_SHIPPING_THRESHOLD, Paise, PriceBreakdown, PriceError,
    Rupees, shipping_for,
};
pub use product::{CartItem, Category, Product, ProductSnapshot, ProductSort, is_valid_slug};
pub use status::*;
