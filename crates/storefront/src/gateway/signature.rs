//! Razorpay payment signature verification.
//!
//! After a successful payment the checkout widget returns
//! `razorpay_signature = hex(HMAC-SHA256(key_secret, "<order_id>|<payment_id>"))`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Why a payment signature was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// No key secret is configured, so nothing can be verified.
    #[error("no gateway secret configured")]
    NoSecret,
    /// The signature is empty.
    #[error("signature missing")]
    Missing,
    /// The signature is not hex.
    #[error("signature is not hex encoded")]
    Malformed,
    /// The signature does not match.
    #[error("signature mismatch")]
    Mismatch,
}

fn mac_for(secret: &[u8], intent_id: &str, payment_id: &str) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::NoSecret)?;
    mac.update(intent_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Compute the hex signature the gateway would send for this payment.
///
/// # Errors
///
/// Returns [`SignatureError::NoSecret`] if `secret` is empty.
pub fn sign(secret: &[u8], intent_id: &str, payment_id: &str) -> Result<String, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NoSecret);
    }
    let mac = mac_for(secret, intent_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a payment signature in constant time.
///
/// # Errors
///
/// Returns the reason the signature was rejected.
pub fn verify(
    secret: &[u8],
    intent_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NoSecret);
    }
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(SignatureError::Missing);
    }
    let expected = hex::decode(signature).map_err(|_| SignatureError::Malformed)?;

    mac_for(secret, intent_id, payment_id)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"rzp_test_secret_value";

    #[test]
    fn test_sign_then_verify() {
        let signature = sign(SECRET, "order_N1", "pay_N1").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify(SECRET, "order_N1", "pay_N1", &signature).is_ok());
    }

    #[test]
    fn test_known_vector() {
        // HMAC-SHA256("secret", "order_1|pay_1")
        let signature = sign(b"secret", "order_1", "pay_1").unwrap();
        assert_eq!(
            signature,
            "52115a0d3400de9e86aade1f1b6eba9e8974604f4e267a9e9a16633a4c8dd2cb"
        );
    }

    #[test]
    fn test_tampered_payment_id_is_rejected() {
        let signature = sign(SECRET, "order_N1", "pay_N1").unwrap();
        assert_eq!(
            verify(SECRET, "order_N1", "pay_N2", &signature),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify(SECRET, "order_N2", "pay_N1", &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signature = sign(b"another-secret", "order_N1", "pay_N1").unwrap();
        assert_eq!(
            verify(SECRET, "order_N1", "pay_N1", &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_garbage_signatures() {
        assert_eq!(verify(SECRET, "order_N1", "pay_N1", ""), Err(SignatureError::Missing));
        assert_eq!(
            verify(SECRET, "order_N1", "pay_N1", "BAD"),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify(SECRET, "order_N1", "pay_N1", "abcd"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_missing_secret_rejects_everything() {
        assert_eq!(sign(b"", "order_N1", "pay_N1"), Err(SignatureError::NoSecret));
        assert_eq!(
            verify(b"", "order_N1", "pay_N1", "00"),
            Err(SignatureError::NoSecret)
        );
    }
}
