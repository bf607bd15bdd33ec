//! Gateway signature checks.
//!
//! The gateway signs a completed checkout with HMAC-SHA256 over
//! `{order_id}|{payment_id}` keyed by the account secret, hex-encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 and return the lowercase hex digest.
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    // HMAC takes keys of any length; `new_from_slice` cannot fail for SHA-256.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// The signature the gateway sends for a payment.
pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    hmac_sha256_hex(secret, &format!("{order_id}|{payment_id}"))
}

/// Whether `signature` is the gateway's signature for this payment.
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let expected = payment_signature(secret, order_id, payment_id);
    !expected.is_empty() && constant_time_eq(&expected, signature)
}

/// Compare two strings without short-circuiting on the first difference.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_matches_known_vector() {
        // RFC 4231 test case 2.
        assert_eq!(
            hmac_sha256_hex("Jefe", "what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn signature_covers_order_and_payment() {
        let sig = payment_signature("secret", "order_1", "pay_1");
        assert!(verify_payment_signature("secret", "order_1", "pay_1", &sig));
        assert!(!verify_payment_signature("secret", "order_1", "pay_2", &sig));
        assert!(!verify_payment_signature("other", "order_1", "pay_1", &sig));
        assert!(!verify_payment_signature("secret", "order_1", "pay_1", &sig.to_uppercase()));
    }

    #[test]
    fn constant_time_eq_behaves_like_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }
}
