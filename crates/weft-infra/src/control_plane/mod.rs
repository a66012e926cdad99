//! Control-plane HTTP client.

pub mod client;

pub use client::ControlPlaneClient;
