//! Public order numbers: `SAU-<time36>-<rand36>`.
//!
//! The first segment is the Unix millisecond timestamp in uppercase base 36,
//! so numbers sort by creation time. The second is four uniformly random
//! base-36 characters (1 679 616 combinations), which makes collisions within
//! one millisecond unlikely without a central counter. The storage layer's
//! unique index is the final arbiter; callers regenerate on conflict.

use core::fmt;
use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Literal prefix of every order number.
pub const ORDER_NUMBER_PREFIX: &str = "SAU";

/// Length of the random suffix.
pub const RANDOM_SUFFIX_LEN: usize = 4;

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// The value does not start with `SAU-`.
    #[error("order number must start with {ORDER_NUMBER_PREFIX}-")]
    MissingPrefix,
    /// The value does not have exactly three hyphen-separated segments.
    #[error("order number must have the form SAU-<time>-<suffix>")]
    Malformed,
    /// A segment contains characters outside `[A-Z0-9]`.
    #[error("order number segments must be uppercase base-36")]
    InvalidCharacters,
    /// The random suffix is not four characters long.
    #[error("order number suffix must be {RANDOM_SUFFIX_LEN} characters")]
    BadSuffixLength,
}

/// A human-quotable order identifier.
///
/// ```
/// use saumara_core::OrderNumber;
///
/// let number: OrderNumber = "SAU-LX2K9Q1C-7F3A".parse().unwrap();
/// assert_eq!(number.as_str(), "SAU-LX2K9Q1C-7F3A");
/// assert!("SAU-LX2K9Q1C-7F3".parse::<OrderNumber>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate a number for the current time using the thread-local RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(chrono::Utc::now().timestamp_millis(), &mut rand::rng())
    }

    /// Generate a number for a given Unix millisecond timestamp.
    ///
    /// Negative timestamps are clamped to zero.
    #[must_use]
    pub fn generate_at<R: Rng + ?Sized>(unix_ms: i64, rng: &mut R) -> Self {
        let time = to_base36(u64::try_from(unix_ms).unwrap_or(0));
        let suffix: String = (0..RANDOM_SUFFIX_LEN)
            .map(|_| {
                let index = rng.random_range(0..BASE36_DIGITS.len());
                char::from(BASE36_DIGITS.get(index).copied().unwrap_or(b'0'))
            })
            .collect();
        Self(format!("{ORDER_NUMBER_PREFIX}-{time}-{suffix}"))
    }

    /// Parse and validate an order number.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match `SAU-[A-Z0-9]+-[A-Z0-9]{4}`.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let rest = s
            .strip_prefix(ORDER_NUMBER_PREFIX)
            .and_then(|r| r.strip_prefix('-'))
            .ok_or(OrderNumberError::MissingPrefix)?;

        let (time, suffix) = rest.split_once('-').ok_or(OrderNumberError::Malformed)?;
        if time.is_empty() || suffix.contains('-') {
            return Err(OrderNumberError::Malformed);
        }

        let is_base36 = |segment: &str| {
            segment
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        };
        if !is_base36(time) || !is_base36(suffix) {
            return Err(OrderNumberError::InvalidCharacters);
        }
        if suffix.len() != RANDOM_SUFFIX_LEN {
            return Err(OrderNumberError::BadSuffixLength);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the order number and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Render a value in uppercase base 36.
#[must_use]
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::new();
    while value > 0 {
        let index = usize::try_from(value % 36).unwrap_or(0);
        digits.push(BASE36_DIGITS.get(index).copied().unwrap_or(b'0'));
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
