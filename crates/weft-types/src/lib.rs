//! Shared domain types for the Weft executor node.
//!
//! This crate defines the wire shapes exchanged with the control plane
//! (sealed credentials, workflow tasks), the dispatch envelope types that
//! flow between workflow steps, poll-schedule state, executor configuration,
//! and the error taxonomy. It has no IO dependencies -- `weft-core` and
//! `weft-infra` both build on it.

pub mod config;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod poll;
