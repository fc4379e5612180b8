//! Webhook signature verification.
//!
//! The gateway signs each transaction callback with HMAC-SHA512 over a
//! fixed-order concatenation of transaction fields and sends the digest as
//! lowercase hex.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::domain::foundation::ValidationError;

use super::{TransactionCallback, WebhookPayload};

type HmacSha512 = Hmac<Sha512>;

/// Verifies callback signatures against the shared HMAC secret.
pub struct SignatureVerifier {
    secret: SecretString,
}

impl SignatureVerifier {
    /// Creates a verifier; the secret must not be blank.
    pub fn new(secret: SecretString) -> Result<Self, ValidationError> {
        if secret.expose_secret().trim().is_empty() {
            return Err(ValidationError::empty_field("hmac_secret"));
        }
        Ok(Self { secret })
    }

    /// True if the payload's HMAC matches the computed digest.
    ///
    /// A missing HMAC, a non-hex HMAC or a blank secret all verify as false.
    pub fn verify(&self, payload: &WebhookPayload) -> bool {
        let Some(supplied) = payload.hmac.as_deref() else {
            return false;
        };
        self.verify_callback(&payload.obj, supplied)
    }

    /// Verifies a callback against an explicitly supplied hex digest.
    pub fn verify_callback(&self, callback: &TransactionCallback, supplied_hex: &str) -> bool {
        let Ok(supplied) = hex::decode(supplied_hex.trim()) else {
            return false;
        };
        match self.digest(&callback.signing_string()) {
            Some(expected) => constant_time_compare(&expected, &supplied),
            None => false,
        }
    }

    /// Hex digest of `callback` under this verifier's secret.
    pub fn sign(&self, callback: &TransactionCallback) -> Option<String> {
        self.digest(&callback.signing_string()).map(hex::encode)
    }

    fn digest(&self, message: &str) -> Option<Vec<u8>> {
        let secret = self.secret.expose_secret();
        if secret.is_empty() {
            return None;
        }
        let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(message.as_bytes());
        Some(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_SECRET: &str = "hmac_test_secret_0123456789";

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SecretString::new(TEST_SECRET.to_string())).unwrap()
    }

    fn payload() -> WebhookPayload {
        serde_json::from_value(json!({
            "type": "TRANSACTION",
            "obj": {
                "id": 1001,
                "amount_cents": 50000,
                "currency": "EGP",
                "success": true,
                "pending": false,
                "order": { "id": 555 },
                "source_data": { "type": "card", "pan": "1111", "sub_type": "Visa" }
            }
        }))
        .unwrap()
    }

    fn signed(mut payload: WebhookPayload) -> WebhookPayload {
        payload.hmac = verifier().sign(&payload.obj);
        payload
    }

    fn reference_digest(message: &str) -> String {
        let mut mac = HmacSha512::new_from_slice(TEST_SECRET.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn blank_secret_is_rejected() {
        assert!(SignatureVerifier::new(SecretString::new("  ".to_string())).is_err());
    }

    #[test]
    fn valid_signature_verifies() {
        assert!(verifier().verify(&signed(payload())));
    }

    #[test]
    fn digest_matches_reference_hmac_sha512() {
        let payload = payload();
        let expected = reference_digest(&payload.obj.signing_string());
        assert_eq!(verifier().sign(&payload.obj).unwrap(), expected);
        assert_eq!(expected.len(), 128);
    }

    #[test]
    fn uppercase_hex_verifies() {
        let mut payload = signed(payload());
        payload.hmac = payload.hmac.map(|h| h.to_uppercase());
        assert!(verifier().verify(&payload));
    }

    #[test]
    fn missing_hmac_fails() {
        assert!(!verifier().verify(&payload()));
    }

    #[test]
    fn non_hex_hmac_fails() {
        let mut payload = payload();
        payload.hmac = Some("not-hex".to_string());
        assert!(!verifier().verify(&payload));
    }

    #[test]
    fn truncated_hmac_fails() {
        let mut payload = signed(payload());
        payload.hmac = payload.hmac.map(|h| h[..64].to_string());
        assert!(!verifier().verify(&payload));
    }

    #[test]
    fn tampered_amount_fails() {
        let mut payload = signed(payload());
        payload.obj.amount_cents = Some("1".to_string());
        assert!(!verifier().verify(&payload));
    }

    #[test]
    fn tampered_success_flag_fails() {
        let mut payload = signed(payload());
        payload.obj.success = Some(false);
        assert!(!verifier().verify(&payload));
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = signed(payload());
        let other = SignatureVerifier::new(SecretString::new("another_secret".to_string())).unwrap();
        assert!(!other.verify(&payload));
    }
}
