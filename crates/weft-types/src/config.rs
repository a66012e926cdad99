//! Executor configuration types.
//!
//! Deserialized from `{data_dir}/config.toml` by `weft-infra`. Secret-bearing
//! fields (the control-plane API token and the executor's base64 private key)
//! are wrapped in [`secrecy::SecretString`] so they are redacted from Debug
//! output and zeroed on drop.

use secrecy::SecretString;
use serde::Deserialize;

/// Top-level executor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Stable identifier for this executor; bound into credential key
    /// derivation by the control plane.
    pub executor_id: String,
    /// SQLite database file, relative to the data directory.
    pub database_path: String,
    pub control_plane: ControlPlaneConfig,
    pub credentials: CredentialConfig,
    pub polling: PollingConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            executor_id: "weft-executor".to_string(),
            database_path: "weft.db".to_string(),
            control_plane: ControlPlaneConfig::default(),
            credentials: CredentialConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

/// Control-plane endpoint and auth.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    pub base_url: String,
    pub api_token: SecretString,
    /// Per-request timeout for control-plane calls.
    pub request_timeout_seconds: u64,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8420".to_string(),
            api_token: SecretString::from(""),
            request_timeout_seconds: 30,
        }
    }
}

/// Credential-resolution key material.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Base64-encoded 32-byte X25519 scalar. Required to resolve sealed
    /// credentials; the executor refuses to start without it.
    pub private_key_b64: Option<SecretString>,
}

/// Poll runner timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Default gap for schedules created without an explicit one.
    pub default_gap_seconds: u32,
    /// How often the runner sweeps for due schedules.
    pub tick_interval_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            default_gap_seconds: 60,
            tick_interval_seconds: 5,
        }
    }
}
