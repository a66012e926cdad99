//! Executor key material.

use weft_types::credential::PUBLIC_KEY_LEN;
use weft_types::error::CredentialError;
use x25519_dalek::{PublicKey, StaticSecret};

/// The executor's long-lived X25519 private key.
///
/// Wraps [`StaticSecret`], which zeroes its scalar on drop. The raw bytes are
/// validated to be exactly 32 at construction, so `resolve` never sees a
/// malformed private key.
#[derive(Clone)]
pub struct ExecutorPrivateKey {
    secret: StaticSecret,
}

impl ExecutorPrivateKey {
    /// Build from raw bytes; anything other than exactly 32 bytes is
    /// rejected with `InvalidKeyMaterial`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CredentialError> {
        let array: [u8; PUBLIC_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| CredentialError::InvalidKeyMaterial {
                    reason: format!(
                        "executor private key is {} bytes, expected {PUBLIC_KEY_LEN}",
                        bytes.len()
                    ),
                })?;
        Ok(Self {
            secret: StaticSecret::from(array),
        })
    }

    /// Generate a fresh keypair (development and tests; production keys come
    /// from startup configuration).
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(chacha20poly1305::aead::OsRng),
        }
    }

    /// The matching public key, for the control plane to seal against.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.secret)
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

/// Debug never shows the scalar.
impl std::fmt::Debug for ExecutorPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExecutorPrivateKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        assert!(matches!(
            ExecutorPrivateKey::from_bytes(&[0u8; 31]),
            Err(CredentialError::InvalidKeyMaterial { .. })
        ));
        assert!(matches!(
            ExecutorPrivateKey::from_bytes(&[0u8; 33]),
            Err(CredentialError::InvalidKeyMaterial { .. })
        ));
        assert!(ExecutorPrivateKey::from_bytes(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_public_key_is_deterministic() {
        let key = ExecutorPrivateKey::from_bytes(&[7u8; 32]).unwrap();
        let again = ExecutorPrivateKey::from_bytes(&[7u8; 32]).unwrap();
        assert_eq!(key.public_key().as_bytes(), again.public_key().as_bytes());
    }

    #[test]
    fn test_debug_hides_scalar() {
        let key = ExecutorPrivateKey::from_bytes(&[0xAB; 32]).unwrap();
        assert_eq!(format!("{key:?}"), "ExecutorPrivateKey(..)");
    }
}
