//! Online payment references and gateway signature checks.
//!
//! The gateway signs `"{payment_ref}|{payment_id}"` with HMAC-SHA256 using the
//! shared key secret and sends the hex digest back with the payment id.

use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// New payment reference handed to the gateway for an online order.
pub fn new_payment_ref() -> String {
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(14).map(char::from).collect();
    format!("pay_{suffix}")
}

/// Human-facing order number.
pub fn new_order_number() -> String {
    format!("TB-{:08}", rand::random::<u32>() % 100_000_000)
}

fn mac(secret: &str, payment_ref: &str, payment_id: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payment_ref.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Some(mac)
}

/// Hex signature the gateway is expected to produce.
pub fn sign(secret: &str, payment_ref: &str, payment_id: &str) -> String {
    mac(secret, payment_ref, payment_id)
        .map(|m| hex::encode(m.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Constant-time check of a gateway signature.
pub fn verify(secret: &str, payment_ref: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    mac(secret, payment_ref, payment_id).is_some_and(|m| m.verify_slice(&provided).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let sig = sign("key-secret", "pay_abc", "gw_123");
        assert_eq!(sig.len(), 64);
        assert!(verify("key-secret", "pay_abc", "gw_123", &sig));
        assert!(verify("key-secret", "pay_abc", "gw_123", &sig.to_uppercase()));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let sig = sign("key-secret", "pay_abc", "gw_123");
        assert!(!verify("other-secret", "pay_abc", "gw_123", &sig));
        assert!(!verify("key-secret", "pay_abc", "gw_124", &sig));
        assert!(!verify("key-secret", "pay_abc", "gw_123", "not-hex"));
    }

    #[test]
    fn test_identifiers() {
        assert!(new_payment_ref().starts_with("pay_"));
        assert_eq!(new_payment_ref().len(), 18);
        let number = new_order_number();
        assert!(number.starts_with("TB-"));
        assert_eq!(number.len(), 11);
    }
}
