//! Executor configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`ExecutorConfig`]. Falls back to defaults when the file is missing or
//! malformed; a bad config file must never prevent the executor from
//! starting (it just won't resolve credentials until a key is configured).

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::ExposeSecret;

use weft_core::credential::ExecutorPrivateKey;
use weft_types::config::ExecutorConfig;
use weft_types::error::CredentialError;

/// Load executor configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`ExecutorConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_executor_config(data_dir: &Path) -> ExecutorConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ExecutorConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ExecutorConfig::default();
        }
    };

    match toml::from_str::<ExecutorConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ExecutorConfig::default()
        }
    }
}

/// Decode the configured base64 private key into an [`ExecutorPrivateKey`].
///
/// The error carries only what went wrong structurally (missing, bad base64,
/// wrong length), never any key bytes.
pub fn decode_private_key(config: &ExecutorConfig) -> Result<ExecutorPrivateKey, CredentialError> {
    let encoded = config.credentials.private_key_b64.as_ref().ok_or_else(|| {
        CredentialError::InvalidKeyMaterial {
            reason: "credentials.private_key_b64 is not configured".to_string(),
        }
    })?;

    let bytes = STANDARD.decode(encoded.expose_secret()).map_err(|_| {
        CredentialError::InvalidKeyMaterial {
            reason: "credentials.private_key_b64 is not valid base64".to_string(),
        }
    })?;

    ExecutorPrivateKey::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_executor_config(tmp.path()).await;
        assert_eq!(config.executor_id, "weft-executor");
        assert_eq!(config.polling.default_gap_seconds, 60);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
executor_id = "exec-eu-1"

[polling]
default_gap_seconds = 15
"#,
        )
        .await
        .unwrap();

        let config = load_executor_config(tmp.path()).await;
        assert_eq!(config.executor_id, "exec-eu-1");
        assert_eq!(config.polling.default_gap_seconds, 15);
        // Unspecified sections keep their defaults.
        assert_eq!(config.control_plane.request_timeout_seconds, 30);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_executor_config(tmp.path()).await;
        assert_eq!(config.executor_id, "weft-executor");
    }

    #[test]
    fn decode_private_key_missing() {
        let config = ExecutorConfig::default();
        let err = decode_private_key(&config).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidKeyMaterial { .. }));
    }

    #[test]
    fn decode_private_key_roundtrip() {
        let key = ExecutorPrivateKey::generate();
        let public = key.public_key();

        let mut config = ExecutorConfig::default();
        // Re-encode a known 32-byte value; any 32 bytes form a valid scalar.
        config.credentials.private_key_b64 =
            Some(secrecy::SecretString::from(STANDARD.encode([7u8; 32])));
        let decoded = decode_private_key(&config).unwrap();
        assert_eq!(
            decoded.public_key().as_bytes(),
            ExecutorPrivateKey::from_bytes(&[7u8; 32])
                .unwrap()
                .public_key()
                .as_bytes()
        );
        // Unrelated keys stay unrelated.
        assert_ne!(decoded.public_key().as_bytes(), public.as_bytes());
    }

    #[test]
    fn decode_private_key_rejects_bad_base64() {
        let mut config = ExecutorConfig::default();
        config.credentials.private_key_b64 = Some(secrecy::SecretString::from("%%%not-base64%%%"));
        assert!(matches!(
            decode_private_key(&config).unwrap_err(),
            CredentialError::InvalidKeyMaterial { .. }
        ));
    }

    #[test]
    fn decode_private_key_rejects_wrong_length() {
        let mut config = ExecutorConfig::default();
        config.credentials.private_key_b64 =
            Some(secrecy::SecretString::from(STANDARD.encode([7u8; 16])));
        assert!(matches!(
            decode_private_key(&config).unwrap_err(),
            CredentialError::InvalidKeyMaterial { .. }
        ));
    }
}
