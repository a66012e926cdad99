//! Sealed-credential resolution.
//!
//! The control plane encrypts each secret to this executor's static X25519
//! public key with a one-time ephemeral keypair; [`resolver::resolve`]
//! recovers the plaintext without the executor ever persisting it.
//! [`client::CredentialClient`] is what action handlers actually hold: it
//! fetches a fresh sealed blob per resolution and optionally keeps one
//! decrypted value cached for the lifetime of the owning integration
//! instance.

pub mod cache;
pub mod client;
pub mod keys;
pub mod resolver;

pub use cache::CredentialCache;
pub use client::{CredentialClient, SealedCredentialSource};
pub use keys::ExecutorPrivateKey;
pub use resolver::{resolve, seal};
