//! Core logic for the Weft executor node.
//!
//! Three components, each invoked by an external caller (the workflow engine
//! or a timer) -- none runs an internal event loop:
//!
//! - [`credential`] -- recovers plaintext secrets from sealed blobs shipped
//!   by the control plane (X25519 + HKDF-SHA256 + ChaCha20-Poly1305).
//! - [`dispatch`] -- routes workflow-step invocations to shape-tagged action
//!   handlers and aggregates their outputs per edge.
//! - [`poll`] -- turns periodic "check now" signals into newly observed
//!   external records and advances a persisted cursor.
//!
//! This crate defines the "ports" (collaborator traits) that `weft-infra`
//! implements. It depends only on `weft-types` -- never on any database or
//! HTTP crate.

pub mod credential;
pub mod dispatch;
pub mod poll;
