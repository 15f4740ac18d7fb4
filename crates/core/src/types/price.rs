//! Rupee amounts and the storefront price policy.
//!
//! Catalog prices, cart lines and order totals are whole rupees. The payment
//! gateway works in paise (1 rupee = 100 paise), so conversion happens once,
//! at the gateway boundary, via [`Rupees::to_paise`].
//!
//! # Price policy
//!
//! ```text
//! subtotal = Σ unit_price × quantity
//! shipping = 0     if subtotal > 2000
//!            199   otherwise
//! total    = subtotal + shipping
//! ```
//!
//! The threshold is strict: a subtotal of exactly ₹2,000 still pays shipping.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Serialize};

use super::product::CartItem;

/// Subtotals strictly above this amount ship free.
pub const FREE_SHIPPING_THRESHOLD: Rupees = Rupees(2000);

/// Flat shipping charged at or below [`FREE_SHIPPING_THRESHOLD`].
pub const FLAT_SHIPPING: Rupees = Rupees(199);

/// A non-negative whole-rupee amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rupees(u64);

impl Rupees {
    /// Zero rupees.
    pub const ZERO: Self = Self(0);

    /// Create an amount from whole rupees.
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// The amount in whole rupees.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Convert to the gateway's minor unit.
    #[must_use]
    pub const fn to_paise(self) -> Paise {
        Paise(self.0.saturating_mul(100))
    }

    /// Multiply a unit price by a line quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(u64::from(quantity)))
    }

    /// Convert to a signed value for storage columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount does not fit in an `i64`.
    pub fn to_i64(self) -> Result<i64, PriceError> {
        i64::try_from(self.0).map_err(|_| PriceError::OutOfRange(self.0.to_string()))
    }
}

impl TryFrom<i64> for Rupees {
    type Error = PriceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| PriceError::Negative(value))
    }
}

impl Add for Rupees {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Formats with the rupee sign and Indian digit grouping, e.g. `₹1,25,000`.
impl fmt::Display for Rupees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        if digits.len() <= 3 {
            return write!(f, "₹{digits}");
        }

        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (front, back) = rest.split_at(rest.len() - 2);
            groups.push(back);
            rest = front;
        }
        groups.push(rest);
        groups.reverse();

        write!(f, "₹{},{tail}", groups.join(","))
    }
}

/// An amount in paise, the gateway's minor currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paise(u64);

impl Paise {
    /// Create an amount from paise.
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// The amount in paise.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Paise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} paise", self.0)
    }
}

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors converting stored amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// A stored amount was negative.
    #[error("amount cannot be negative (got {0})")]
    Negative(i64),
    /// An amount does not fit the storage column.
    #[error("amount out of range: {0}")]
    OutOfRange(String),
}

/// Subtotal, shipping and total for a set of cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Rupees,
    pub shipping: Rupees,
    pub total: Rupees,
}

impl PriceBreakdown {
    /// Apply the price policy to a subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Rupees) -> Self {
        let shipping = shipping_for(subtotal);
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }

    /// Apply the price policy to cart lines.
    #[must_use]
    pub fn for_items(items: &[CartItem]) -> Self {
        Self::from_subtotal(items.iter().map(CartItem::line_total).sum())
    }

    /// Whether this breakdown qualifies for free shipping.
    #[must_use]
    pub fn ships_free(&self) -> bool {
        self.shipping == Rupees::ZERO
    }
}

/// Shipping charge for a subtotal.
#[must_use]
pub fn shipping_for(subtotal: Rupees) -> Rupees {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        Rupees::ZERO
    } else {
        FLAT_SHIPPING
    }
}
