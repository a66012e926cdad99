//! Credential resolution as seen by action handlers.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretBox;
use tracing::warn;
use uuid::Uuid;

use weft_types::credential::SealedCredential;
use weft_types::error::CredentialError;

use super::cache::CredentialCache;
use super::keys::ExecutorPrivateKey;
use super::resolver;

/// Where sealed blobs come from. `weft-infra` implements this against the
/// control-plane HTTP API; tests use an in-memory fake.
#[async_trait]
pub trait SealedCredentialSource: Send + Sync {
    /// Fetch the current sealed blob for a credential. Each call may return
    /// a newer blob (rotated payload, fresh expiry).
    async fn fetch_sealed(
        &self,
        workspace_id: Uuid,
        credential_id: &str,
    ) -> Result<SealedCredential, CredentialError>;
}

/// Fetches, decrypts, and caches credential values for action handlers.
///
/// Handlers never see sealed blobs or key material; they ask for a
/// credential id and get plaintext bytes in a [`SecretBox`]. One decrypted
/// value is cached per client, scoped to the owning integration instance's
/// lifetime.
pub struct CredentialClient {
    source: Arc<dyn SealedCredentialSource>,
    private_key: ExecutorPrivateKey,
    cache: CredentialCache,
}

impl CredentialClient {
    pub fn new(source: Arc<dyn SealedCredentialSource>, private_key: ExecutorPrivateKey) -> Self {
        Self {
            source,
            private_key,
            cache: CredentialCache::new(),
        }
    }

    /// Resolve a credential to its plaintext value.
    ///
    /// Serves from the cache when the cached entry matches `credential_id`;
    /// otherwise fetches a fresh sealed blob, decrypts it, and caches the
    /// result. The first resolution runs under the cache's write lock, so
    /// concurrent callers for the same credential trigger exactly one fetch
    /// and share the cached value. A cached value that has meanwhile expired
    /// server-side is invisible here -- expiry is a property of the sealed
    /// blob, and a cached plaintext stays valid for the owner's lifetime.
    pub async fn resolve(
        &self,
        workspace_id: Uuid,
        credential_id: &str,
    ) -> Result<Arc<SecretBox<Vec<u8>>>, CredentialError> {
        let result = self
            .cache
            .get_or_try_resolve(credential_id, || async {
                let sealed = self.source.fetch_sealed(workspace_id, credential_id).await?;
                resolver::resolve(&sealed, &self.private_key)
            })
            .await;

        if let Err(ref err) = result {
            // Never log payload details; the error variants carry only ids.
            warn!(%workspace_id, credential_id, error = %err, "credential resolution failed");
        }
        result
    }

    /// Drop any cached plaintext. Called when the control plane signals a
    /// credential rotation for this integration instance.
    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }
}

impl std::fmt::Debug for CredentialClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialClient(..)")
    }
}
