//! In-memory cache for one resolved credential.
//!
//! An integration instance is bound to a single credential, so the cache
//! holds at most one decrypted value for the lifetime of its owner. The
//! first resolution for a credential runs under the write lock: concurrent
//! callers for the same id wait and then share the cached value instead of
//! each fetching and decrypting their own copy. Nothing is ever written to
//! disk.

use std::future::Future;
use std::sync::Arc;

use secrecy::SecretBox;
use tokio::sync::RwLock;
use tracing::debug;

use weft_types::error::CredentialError;

/// Holds at most one decrypted credential value.
///
/// The value is shared as `Arc<SecretBox<..>>` so concurrent handler calls
/// can borrow it without re-resolving; the bytes are zeroed when the last
/// clone drops.
#[derive(Default)]
pub struct CredentialCache {
    /// Keyed by credential id so a stale entry from a credential swap is
    /// never served.
    slot: RwLock<Option<(String, Arc<SecretBox<Vec<u8>>>)>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value, if it belongs to `credential_id`.
    pub async fn get(&self, credential_id: &str) -> Option<Arc<SecretBox<Vec<u8>>>> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some((id, value)) if id == credential_id => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Return the cached value for `credential_id`, resolving it with
    /// `init` on a miss.
    ///
    /// `init` runs while the write lock is held, so exactly one caller
    /// resolves; everyone else blocks on the lock, re-checks the slot, and
    /// takes the freshly cached value. A failed `init` caches nothing.
    pub async fn get_or_try_resolve<F, Fut>(
        &self,
        credential_id: &str,
        init: F,
    ) -> Result<Arc<SecretBox<Vec<u8>>>, CredentialError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SecretBox<Vec<u8>>, CredentialError>>,
    {
        if let Some(value) = self.get(credential_id).await {
            debug!(credential_id, "credential cache hit");
            return Ok(value);
        }

        let mut slot = self.slot.write().await;
        // Another caller may have resolved while we waited for the lock.
        if let Some((id, value)) = slot.as_ref() {
            if id == credential_id {
                debug!(credential_id, "credential cache hit");
                return Ok(Arc::clone(value));
            }
        }

        let value = Arc::new(init().await?);
        *slot = Some((credential_id.to_string(), Arc::clone(&value)));
        Ok(value)
    }

    /// Drop the cached value, if any. Used when the control plane signals a
    /// credential rotation.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
    }
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCache(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::ExposeSecret;

    fn value(bytes: &[u8]) -> SecretBox<Vec<u8>> {
        SecretBox::new(Box::new(bytes.to_vec()))
    }

    #[tokio::test]
    async fn test_get_empty() {
        let cache = CredentialCache::new();
        assert!(cache.get("cred-1").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_then_get() {
        let cache = CredentialCache::new();
        cache
            .get_or_try_resolve("cred-1", || async { Ok(value(b"token")) })
            .await
            .unwrap();
        let got = cache.get("cred-1").await.unwrap();
        assert_eq!(got.expose_secret(), b"token");
    }

    #[tokio::test]
    async fn test_mismatched_id_misses() {
        let cache = CredentialCache::new();
        cache
            .get_or_try_resolve("cred-1", || async { Ok(value(b"token")) })
            .await
            .unwrap();
        assert!(cache.get("cred-2").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = CredentialCache::new();
        cache
            .get_or_try_resolve("cred-1", || async { Ok(value(b"token")) })
            .await
            .unwrap();
        cache.invalidate().await;
        assert!(cache.get("cred-1").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_init_caches_nothing() {
        let cache = CredentialCache::new();
        let err = cache
            .get_or_try_resolve("cred-1", || async {
                Err(CredentialError::Fetch {
                    credential_id: "cred-1".to_string(),
                    message: "unreachable".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Fetch { .. }));
        assert!(cache.get("cred-1").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_resolves_run_init_once() {
        let cache = Arc::new(CredentialCache::new());
        let init_calls = Arc::new(AtomicUsize::new(0));

        let resolve = |cache: Arc<CredentialCache>, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_try_resolve("cred-1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Linger so the other callers queue behind the write lock.
                    tokio::task::yield_now().await;
                    Ok(value(b"token"))
                })
                .await
                .unwrap()
        };

        let (a, b, c) = tokio::join!(
            resolve(Arc::clone(&cache), Arc::clone(&init_calls)),
            resolve(Arc::clone(&cache), Arc::clone(&init_calls)),
            resolve(Arc::clone(&cache), Arc::clone(&init_calls)),
        );

        assert_eq!(init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.expose_secret(), b"token");
        // All callers share the single cached allocation.
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn test_resolve_replaces_other_credential() {
        let cache = CredentialCache::new();
        cache
            .get_or_try_resolve("cred-1", || async { Ok(value(b"old")) })
            .await
            .unwrap();
        let got = cache
            .get_or_try_resolve("cred-2", || async { Ok(value(b"new")) })
            .await
            .unwrap();
        assert_eq!(got.expose_secret(), b"new");
        // Single slot: the previous credential is gone.
        assert!(cache.get("cred-1").await.is_none());
    }
}
