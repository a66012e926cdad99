//! Polling-trigger cursor tracking.
//!
//! A polling trigger periodically asks an external source "what is new since
//! last time?". [`tracker::PollCursorTracker`] owns the answer: it filters
//! candidates against the persisted cursor (or the schedule's creation time
//! on the very first tick), enqueues a workflow-run task per new record, and
//! advances the cursor through the records it actually managed to enqueue.

pub mod cursor;
pub mod ports;
pub mod tracker;

pub use cursor::{compare_ordering_keys, is_after_cursor};
pub use ports::{PollRecordSource, ScheduleStore, TaskPublisher};
pub use tracker::PollCursorTracker;
