//! Infrastructure for the Weft executor: configuration loading, SQLite
//! persistence for poll schedules, and the control-plane HTTP client.
//!
//! Everything here implements a port defined in `weft-core`; core logic
//! never sees sqlx or reqwest types.

pub mod config;
pub mod control_plane;
pub mod sqlite;
