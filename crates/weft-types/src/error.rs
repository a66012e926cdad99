//! Error taxonomy for the executor.
//!
//! Every variant carries enough identifying context (credential id, action
//! type, schedule key) to diagnose a failure without reproduction.
//!
//! IMPORTANT: credential errors never include plaintext, key material, or
//! ciphertext in their Display/Debug output.

use thiserror::Error;

/// Errors from sealed-credential resolution. Fail-closed and non-retryable
/// by the resolver itself; the caller must obtain a fresh sealed blob.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The blob's expiry deadline has passed. No decryption was attempted.
    #[error("credential '{credential_id}' is expired")]
    Expired { credential_id: String },

    /// A key, nonce, or public key had the wrong length.
    #[error("invalid key material: {reason}")]
    InvalidKeyMaterial { reason: String },

    /// AEAD open failed (tag or ciphertext mismatch). No partial plaintext
    /// is ever returned.
    #[error("decryption failed for credential '{credential_id}'")]
    DecryptionFailed { credential_id: String },

    /// Fetching a fresh sealed blob from the control plane failed.
    #[error("failed to fetch sealed credential '{credential_id}': {message}")]
    Fetch {
        credential_id: String,
        message: String,
    },
}

/// Opaque error returned by action handlers. Retry/backoff against the
/// third-party API is the integration's responsibility; the dispatcher only
/// records the message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from dispatching a workflow-step invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler registered for the action type. A workflow-configuration
    /// defect, not a transient failure.
    #[error("no handler registered for action type '{action_type}'")]
    ActionNotFound { action_type: String },

    /// Two handlers registered for the same action type (builder-time).
    #[error("action type '{action_type}' registered twice")]
    DuplicateAction { action_type: String },

    /// A routable handler selected an output edge outside `[0, edge_count)`.
    #[error(
        "action '{action_type}' item {item_index} routed to output {output_index}, \
         but only {output_edge_count} output edges exist"
    )]
    OutputIndexOutOfBounds {
        action_type: String,
        item_index: usize,
        output_index: usize,
        output_edge_count: usize,
    },

    /// A bulk handler returned the wrong number of output edges.
    #[error("action '{action_type}' produced {actual} output edges, expected {expected}")]
    OutputEdgeMismatch {
        action_type: String,
        expected: usize,
        actual: usize,
    },

    /// A handler failed on one item under the abort policy.
    #[error("action '{action_type}' failed on item {item_index}: {source}")]
    Handler {
        action_type: String,
        item_index: usize,
        #[source]
        source: HandlerError,
    },

    /// The caller cancelled the invocation; the step fails fast rather than
    /// completing with a partial result.
    #[error("action '{action_type}' cancelled")]
    Cancelled { action_type: String },
}

/// Opaque error from a poll record source.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error from enqueueing an [`crate::poll::ExecuteWorkflowTask`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PublishError(pub String);

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from a poll tick.
#[derive(Debug, Error)]
pub enum PollError {
    /// The trigger was never activated or its schedule was deleted. Fatal.
    #[error("no poll schedule found for trigger {key}")]
    ScheduleNotFound { key: String },

    /// The external source failed to return candidates.
    #[error("poll source failed for trigger {key}: {source}")]
    Source {
        key: String,
        #[source]
        source: SourceError,
    },

    /// The schedule store failed.
    #[error("schedule store failed for trigger {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: RepositoryError,
    },

    /// The tick was cancelled mid-flight; the cursor is not advanced past
    /// what was already enqueued.
    #[error("poll tick cancelled for trigger {key}")]
    Cancelled { key: String },
}

/// Errors from storage operations (used by trait definitions in `weft-core`).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_display() {
        let err = CredentialError::Expired {
            credential_id: "cred-9".to_string(),
        };
        assert_eq!(err.to_string(), "credential 'cred-9' is expired");
    }

    #[test]
    fn test_dispatch_error_carries_context() {
        let err = DispatchError::OutputIndexOutOfBounds {
            action_type: "classify".to_string(),
            item_index: 2,
            output_index: 5,
            output_edge_count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("classify"));
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_poll_error_display() {
        let err = PollError::ScheduleNotFound {
            key: "ws/node-1/wf".to_string(),
        };
        assert!(err.to_string().contains("ws/node-1/wf"));
    }

    #[test]
    fn test_credential_errors_never_contain_secrets() {
        // Display output may name the credential, never its contents.
        let secret_bytes = "sk-super-secret-value-12345";
        let errors = [
            CredentialError::Expired {
                credential_id: "cred-1".to_string(),
            },
            CredentialError::InvalidKeyMaterial {
                reason: "ephemeral public key is 31 bytes, expected 32".to_string(),
            },
            CredentialError::DecryptionFailed {
                credential_id: "cred-1".to_string(),
            },
        ];
        for err in &errors {
            let msg = err.to_string();
            assert!(!msg.contains(secret_bytes), "error leaks secret: {msg}");
        }
    }
}
