//! Checkout form, shipping address and field validation.
//!
//! The browser submits a [`CheckoutForm`] of raw strings. [`CheckoutForm::validate`]
//! turns it into a [`ShippingAddress`] or reports every failing field at once,
//! so the form can highlight all of them in a single round.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::email::Email;

/// Indian states and union territories the storefront ships to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndianState {
    AndhraPradesh,
    Assam,
    Bihar,
    Delhi,
    Goa,
    Gujarat,
    Haryana,
    HimachalPradesh,
    Jharkhand,
    Karnataka,
    Kerala,
    MadhyaPradesh,
    Maharashtra,
    Manipur,
    Meghalaya,
    Mizoram,
    Nagaland,
    Odisha,
    Punjab,
    Rajasthan,
    Sikkim,
    TamilNadu,
    Telangana,
    Tripura,
    UttarPradesh,
    Uttarakhand,
    WestBengal,
}

impl IndianState {
    /// Every deliverable state, in the order shown in the checkout form.
    pub const ALL: [Self; 27] = [
        Self::AndhraPradesh,
        Self::Assam,
        Self::Bihar,
        Self::Delhi,
        Self::Goa,
        Self::Gujarat,
        Self::Haryana,
        Self::HimachalPradesh,
        Self::Jharkhand,
        Self::Karnataka,
        Self::Kerala,
        Self::MadhyaPradesh,
        Self::Maharashtra,
        Self::Manipur,
        Self::Meghalaya,
        Self::Mizoram,
        Self::Nagaland,
        Self::Odisha,
        Self::Punjab,
        Self::Rajasthan,
        Self::Sikkim,
        Self::TamilNadu,
        Self::Telangana,
        Self::Tripura,
        Self::UttarPradesh,
        Self::Uttarakhand,
        Self::WestBengal,
    ];

    /// Display name, which is also the submitted form value.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AndhraPradesh => "Andhra Pradesh",
            Self::Assam => "Assam",
            Self::Bihar => "Bihar",
            Self::Delhi => "Delhi",
            Self::Goa => "Goa",
            Self::Gujarat => "Gujarat",
            Self::Haryana => "Haryana",
            Self::HimachalPradesh => "Himachal Pradesh",
            Self::Jharkhand => "Jharkhand",
            Self::Karnataka => "Karnataka",
            Self::Kerala => "Kerala",
            Self::MadhyaPradesh => "Madhya Pradesh",
            Self::Maharashtra => "Maharashtra",
            Self::Manipur => "Manipur",
            Self::Meghalaya => "Meghalaya",
            Self::Mizoram => "Mizoram",
            Self::Nagaland => "Nagaland",
            Self::Odisha => "Odisha",
            Self::Punjab => "Punjab",
            Self::Rajasthan => "Rajasthan",
            Self::Sikkim => "Sikkim",
            Self::TamilNadu => "Tamil Nadu",
            Self::Telangana => "Telangana",
            Self::Tripura => "Tripura",
            Self::UttarPradesh => "Uttar Pradesh",
            Self::Uttarakhand => "Uttarakhand",
            Self::WestBengal => "West Bengal",
        }
    }
}

impl fmt::Display for IndianState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndianState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| format!("unknown state: {s}"))
    }
}

impl TryFrom<String> for IndianState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IndianState> for String {
    fn from(value: IndianState) -> Self {
        value.name().to_owned()
    }
}

/// A six-digit Indian postal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pincode(String);

impl Pincode {
    /// Parse a pincode.
    ///
    /// # Errors
    ///
    /// Returns an error unless the trimmed input is exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err("pincode must be six digits".to_owned())
        }
    }

    /// Returns the pincode as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pincode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pincode> for String {
    fn from(value: Pincode) -> Self {
        value.0
    }
}

/// Raw checkout form as submitted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
}

impl CheckoutForm {
    /// Validate every field, collecting all failures.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing each missing or malformed field.
    pub fn validate(&self) -> Result<ShippingAddress, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = required(&mut errors, "name", &self.name);
        let phone = required(&mut errors, "phone", &self.phone);
        let address = required(&mut errors, "address", &self.address);
        let city = required(&mut errors, "city", &self.city);

        let email = if self.email.trim().is_empty() {
            errors.push("email", "is required");
            None
        } else {
            Email::parse(&self.email)
                .map_err(|e| errors.push("email", e.to_string()))
                .ok()
        };

        let state = if self.state.trim().is_empty() {
            errors.push("state", "is required");
            None
        } else {
            self.state
                .parse::<IndianState>()
                .map_err(|e| errors.push("state", e))
                .ok()
        };

        let pincode = if self.pincode.trim().is_empty() {
            errors.push("pincode", "is required");
            None
        } else {
            Pincode::parse(&self.pincode)
                .map_err(|e| errors.push("pincode", e))
                .ok()
        };

        match (name, email, phone, address, city, state, pincode) {
            (
                Some(name),
                Some(email),
                Some(phone),
                Some(address),
                Some(city),
                Some(state),
                Some(pincode),
            ) if errors.is_empty() => Ok(ShippingAddress {
                name,
                email,
                phone,
                delivery: DeliveryAddress {
                    address,
                    city,
                    state,
                    pincode,
                },
            }),
            _ => Err(errors),
        }
    }
}

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, "is required");
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// A validated customer and delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub delivery: DeliveryAddress,
}

impl ShippingAddress {
    /// Convert back to the raw form shape.
    #[must_use]
    pub fn to_form(&self) -> CheckoutForm {
        CheckoutForm {
            name: self.name.clone(),
            email: self.email.to_string(),
            phone: self.phone.clone(),
            address: self.delivery.address.clone(),
            city: self.delivery.city.clone(),
            state: self.delivery.state.to_string(),
            pincode: self.delivery.pincode.to_string(),
        }
    }
}

/// The postal part of an address, stored as the order's `shippingAddress` JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub address: String,
    pub city: String,
    pub state: IndianState,
    pub pincode: Pincode,
}

/// A single field failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All field failures for one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("invalid fields: {}", self.field_names().join(", "))]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    /// Record a failure for `field`.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    /// Whether no failures were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of the failing fields, in submission order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field.as_str()).collect()
    }

    /// Whether `field` failed.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}
