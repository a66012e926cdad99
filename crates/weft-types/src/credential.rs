//! Sealed-credential wire shape.
//!
//! The control plane encrypts each secret to the executor's static X25519
//! public key using a one-time ephemeral keypair, and ships the result as a
//! `SealedCredential`. The executor never receives plaintext over the wire
//! and the control plane never holds the executor's private key.
//!
//! Byte fields travel as base64 strings in JSON (see [`base64_bytes`]).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Expected length of an X25519 public key, in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Expected length of a ChaCha20-Poly1305 nonce, in bytes.
pub const NONCE_LEN: usize = 12;

/// A secret encrypted to one executor, produced fresh per resolution request.
///
/// Immutable once issued; consumed exactly once per resolution call. The
/// `encrypted_payload` is ChaCha20-Poly1305 ciphertext plus tag; the
/// symmetric key is derived from an X25519 ECDH between `ephemeral_public_key`
/// and the executor's static private key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedCredential {
    /// Credential identifier assigned by the control plane.
    pub id: String,
    /// Workspace the credential belongs to.
    pub workspace_id: Uuid,
    /// One-time ephemeral X25519 public key (32 bytes).
    #[serde(with = "base64_bytes")]
    pub ephemeral_public_key: Vec<u8>,
    /// AEAD ciphertext plus authentication tag.
    #[serde(with = "base64_bytes")]
    pub encrypted_payload: Vec<u8>,
    /// ChaCha20-Poly1305 nonce (12 bytes).
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    /// Unix seconds after which the blob must not be decrypted.
    pub expires_at: i64,
    /// The executor this blob was sealed for; bound into key derivation.
    pub executor_id: String,
}

impl SealedCredential {
    /// Whether the blob has passed its expiry deadline.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.expires_at
    }
}

/// Serde adapter encoding `Vec<u8>` fields as standard base64 strings.
pub mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SealedCredential {
        SealedCredential {
            id: "cred-42".to_string(),
            workspace_id: Uuid::now_v7(),
            ephemeral_public_key: vec![7u8; PUBLIC_KEY_LEN],
            encrypted_payload: vec![1, 2, 3, 4, 5],
            nonce: vec![9u8; NONCE_LEN],
            expires_at: Utc::now().timestamp() + 300,
            executor_id: "exec-eu-1".to_string(),
        }
    }

    #[test]
    fn test_wire_fields_are_base64_strings() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json["ephemeral_public_key"].is_string());
        assert!(json["encrypted_payload"].is_string());
        assert!(json["nonce"].is_string());
        assert_eq!(json["executor_id"], "exec-eu-1");
    }

    #[test]
    fn test_json_roundtrip() {
        let original = sample();
        let json_str = serde_json::to_string(&original).unwrap();
        let parsed: SealedCredential = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.id, original.id);
        assert_eq!(parsed.ephemeral_public_key, original.ephemeral_public_key);
        assert_eq!(parsed.encrypted_payload, original.encrypted_payload);
        assert_eq!(parsed.nonce, original.nonce);
        assert_eq!(parsed.expires_at, original.expires_at);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["nonce"] = serde_json::Value::String("not base64 !!!".to_string());
        let result: Result<SealedCredential, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_is_expired() {
        let mut cred = sample();
        assert!(!cred.is_expired());
        cred.expires_at = Utc::now().timestamp() - 10;
        assert!(cred.is_expired());
    }
}
