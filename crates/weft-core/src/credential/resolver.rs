//! Sealed-credential open/seal primitives.
//!
//! Key agreement is X25519 between the executor's static private key and the
//! blob's one-time ephemeral public key. The AEAD key is derived with
//! HKDF-SHA256 under a fixed application salt and an info string that binds
//! the executor id. ChaCha20-Poly1305 authenticates the payload; any tag or
//! ciphertext mismatch fails closed.
//!
//! Binding the executor id into the HKDF info string is derivation hygiene:
//! the same shared secret yields a different AEAD key per executor-id
//! context, so a blob sealed for one executor id never accidentally opens
//! under another. It is NOT a security boundary between two processes that
//! hold the same private key.
//!
//! SECURITY: errors never include plaintext, key material, or ciphertext.

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::Utc;
use hkdf::Hkdf;
use secrecy::SecretBox;
use sha2::Sha256;
use uuid::Uuid;
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret};

use weft_types::credential::{NONCE_LEN, PUBLIC_KEY_LEN, SealedCredential};
use weft_types::error::CredentialError;

use super::keys::ExecutorPrivateKey;

/// Fixed application salt for HKDF-SHA256 key derivation.
const HKDF_SALT: &[u8] = b"weft-credential-v1";

/// HKDF info prefix; the executor id is appended for domain separation.
const HKDF_INFO_PREFIX: &str = "weft-executor:";

/// Recover the plaintext secret from a sealed blob.
///
/// Pure apart from reading the clock for the expiry check; safe under
/// unbounded concurrent invocation. The plaintext is returned in a
/// [`SecretBox`] so it is zeroed on drop and redacted from Debug output.
///
/// # Errors
///
/// - [`CredentialError::Expired`] when `expires_at` has passed (checked
///   before any decryption work).
/// - [`CredentialError::InvalidKeyMaterial`] for malformed ephemeral key or
///   nonce lengths.
/// - [`CredentialError::DecryptionFailed`] on any AEAD mismatch; no partial
///   plaintext is ever returned.
pub fn resolve(
    sealed: &SealedCredential,
    private_key: &ExecutorPrivateKey,
) -> Result<SecretBox<Vec<u8>>, CredentialError> {
    if Utc::now().timestamp() > sealed.expires_at {
        return Err(CredentialError::Expired {
            credential_id: sealed.id.clone(),
        });
    }

    let ephemeral: [u8; PUBLIC_KEY_LEN] = sealed
        .ephemeral_public_key
        .as_slice()
        .try_into()
        .map_err(|_| CredentialError::InvalidKeyMaterial {
            reason: format!(
                "ephemeral public key is {} bytes, expected {PUBLIC_KEY_LEN}",
                sealed.ephemeral_public_key.len()
            ),
        })?;
    if sealed.nonce.len() != NONCE_LEN {
        return Err(CredentialError::InvalidKeyMaterial {
            reason: format!("nonce is {} bytes, expected {NONCE_LEN}", sealed.nonce.len()),
        });
    }

    let shared = private_key
        .secret()
        .diffie_hellman(&PublicKey::from(ephemeral));
    let aead_key = derive_aead_key(&shared, &sealed.executor_id);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&aead_key));
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&sealed.nonce),
            sealed.encrypted_payload.as_slice(),
        )
        .map_err(|_| CredentialError::DecryptionFailed {
            credential_id: sealed.id.clone(),
        })?;

    Ok(SecretBox::new(Box::new(plaintext)))
}

/// Seal a plaintext secret to an executor's public key.
///
/// This is the control-plane side of the protocol; it lives next to
/// [`resolve`] so both sides of the wire format evolve together, and it is
/// what the round-trip tests and local development tooling use. A fresh
/// ephemeral keypair and nonce are generated per call.
pub fn seal(
    plaintext: &[u8],
    executor_public: &PublicKey,
    credential_id: impl Into<String>,
    workspace_id: Uuid,
    executor_id: impl Into<String>,
    ttl_seconds: i64,
) -> Result<SealedCredential, CredentialError> {
    let executor_id = executor_id.into();

    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);
    let shared = ephemeral_secret.diffie_hellman(executor_public);
    let aead_key = derive_aead_key(&shared, &executor_id);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&aead_key));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let encrypted_payload =
        cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CredentialError::InvalidKeyMaterial {
                reason: "AEAD seal failed".to_string(),
            })?;

    Ok(SealedCredential {
        id: credential_id.into(),
        workspace_id,
        ephemeral_public_key: ephemeral_public.as_bytes().to_vec(),
        encrypted_payload,
        nonce: nonce.to_vec(),
        expires_at: Utc::now().timestamp() + ttl_seconds,
        executor_id,
    })
}

/// HKDF-SHA256 over the ECDH shared secret, salted and bound to the
/// executor id.
fn derive_aead_key(shared: &SharedSecret, executor_id: &str) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared.as_bytes());
    let info = format!("{HKDF_INFO_PREFIX}{executor_id}");
    let mut key = [0u8; 32];
    // 32 bytes is always a valid HKDF-SHA256 output length.
    hkdf.expand(info.as_bytes(), &mut key)
        .expect("32-byte HKDF output");
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn test_key() -> ExecutorPrivateKey {
        ExecutorPrivateKey::generate()
    }

    fn seal_for(key: &ExecutorPrivateKey, plaintext: &[u8]) -> SealedCredential {
        seal(
            plaintext,
            &key.public_key(),
            "cred-1",
            Uuid::now_v7(),
            "exec-test",
            300,
        )
        .unwrap()
    }

    // -------------------------------------------------------------------
    // Round trips
    // -------------------------------------------------------------------

    #[test]
    fn test_roundtrip() {
        let key = test_key();
        let sealed = seal_for(&key, b"{\"token\":\"sk-12345\"}");
        let plaintext = resolve(&sealed, &key).unwrap();
        assert_eq!(plaintext.expose_secret(), b"{\"token\":\"sk-12345\"}");
    }

    #[test]
    fn test_roundtrip_empty_plaintext() {
        let key = test_key();
        let sealed = seal_for(&key, b"");
        let plaintext = resolve(&sealed, &key).unwrap();
        assert!(plaintext.expose_secret().is_empty());
    }

    #[test]
    fn test_roundtrip_64k_plaintext() {
        let key = test_key();
        let big: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        let sealed = seal_for(&key, &big);
        let plaintext = resolve(&sealed, &key).unwrap();
        assert_eq!(plaintext.expose_secret(), &big);
    }

    #[test]
    fn test_seal_is_randomized() {
        let key = test_key();
        let a = seal_for(&key, b"same secret");
        let b = seal_for(&key, b"same secret");
        // Fresh ephemeral key and nonce per call.
        assert_ne!(a.ephemeral_public_key, b.ephemeral_public_key);
        assert_ne!(a.encrypted_payload, b.encrypted_payload);
    }

    // -------------------------------------------------------------------
    // Failure modes
    // -------------------------------------------------------------------

    #[test]
    fn test_wrong_private_key_fails_closed() {
        let key = test_key();
        let sealed = seal_for(&key, b"secret");
        let other = test_key();
        assert!(matches!(
            resolve(&sealed, &other),
            Err(CredentialError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_tampered_ciphertext_always_fails() {
        let key = test_key();
        for bit in [0usize, 3, 17] {
            let mut sealed = seal_for(&key, b"a payload long enough to flip bits in");
            let byte = bit / 8;
            sealed.encrypted_payload[byte] ^= 1 << (bit % 8);
            assert!(
                matches!(
                    resolve(&sealed, &key),
                    Err(CredentialError::DecryptionFailed { .. })
                ),
                "bit {bit} flip must fail closed"
            );
        }
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let key = test_key();
        let mut sealed = seal_for(&key, b"secret");
        sealed.nonce[5] ^= 0x01;
        assert!(matches!(
            resolve(&sealed, &key),
            Err(CredentialError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_tampered_ephemeral_key_fails() {
        let key = test_key();
        let mut sealed = seal_for(&key, b"secret");
        sealed.ephemeral_public_key[0] ^= 0x80;
        assert!(matches!(
            resolve(&sealed, &key),
            Err(CredentialError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_expired_fails_before_decryption() {
        let key = test_key();
        let mut sealed = seal_for(&key, b"secret");
        sealed.expires_at = Utc::now().timestamp() - 60;
        let err = resolve(&sealed, &key).unwrap_err();
        assert!(matches!(err, CredentialError::Expired { ref credential_id } if credential_id == "cred-1"));
    }

    #[test]
    fn test_truncated_ephemeral_key_is_invalid_material() {
        let key = test_key();
        let mut sealed = seal_for(&key, b"secret");
        sealed.ephemeral_public_key.truncate(31);
        assert!(matches!(
            resolve(&sealed, &key),
            Err(CredentialError::InvalidKeyMaterial { .. })
        ));
    }

    #[test]
    fn test_truncated_nonce_is_invalid_material() {
        let key = test_key();
        let mut sealed = seal_for(&key, b"secret");
        sealed.nonce.pop();
        assert!(matches!(
            resolve(&sealed, &key),
            Err(CredentialError::InvalidKeyMaterial { .. })
        ));
    }

    // -------------------------------------------------------------------
    // Domain separation
    // -------------------------------------------------------------------

    #[test]
    fn test_executor_id_binds_derivation() {
        // A blob sealed for one executor id does not open when the id in the
        // blob is swapped: the HKDF info string differs, so the AEAD key
        // differs.
        let key = test_key();
        let mut sealed = seal_for(&key, b"secret");
        sealed.executor_id = "some-other-executor".to_string();
        assert!(matches!(
            resolve(&sealed, &key),
            Err(CredentialError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_resolved_secret_debug_is_redacted() {
        let key = test_key();
        let sealed = seal_for(&key, b"sk-super-secret");
        let plaintext = resolve(&sealed, &key).unwrap();
        let debug = format!("{plaintext:?}");
        assert!(!debug.contains("sk-super-secret"), "leaked: {debug}");
    }
}
