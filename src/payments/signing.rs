use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signs official receipts so a printed OR number can be checked against
/// the portal without logging in.
#[derive(Clone)]
pub struct ReceiptSigner {
    secret: Vec<u8>,
}

impl ReceiptSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }

    /// HMAC-SHA256 over `{or_number}|{amount_cents}|{payment_id}`, hex encoded.
    pub fn sign(&self, or_number: &str, amount_cents: i64, payment_id: i64) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
        mac.update(format!("{}|{}|{}", or_number, amount_cents, payment_id).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, or_number: &str, amount_cents: i64, payment_id: i64, signature: &str) -> Result<bool> {
        let expected = self.sign(or_number, amount_cents, payment_id)?;
        Ok(constant_time_eq(&expected, signature))
    }
}

/// Comparison whose timing does not depend on where the inputs differ.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = ReceiptSigner::new("test-secret");
        let signature = signer.sign("OR-0A1B2C3D", 50_000, 42).unwrap();
        assert_eq!(signature.len(), 64);

        assert!(signer.verify("OR-0A1B2C3D", 50_000, 42, &signature).unwrap());
        assert!(!signer.verify("OR-0A1B2C3D", 50_001, 42, &signature).unwrap());
        assert!(!signer.verify("OR-0A1B2C3D", 50_000, 43, &signature).unwrap());
        assert!(!signer.verify("OR-0A1B2C3D", 50_000, 42, "deadbeef").unwrap());
    }

    #[test]
    fn test_different_secrets_disagree() {
        let a = ReceiptSigner::new("one").sign("OR-00000001", 100, 1).unwrap();
        let b = ReceiptSigner::new("two").sign("OR-00000001", 100, 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
