//! SQLite persistence.

pub mod pool;
pub mod schedule;

pub use pool::DatabasePool;
pub use schedule::SqliteScheduleStore;
