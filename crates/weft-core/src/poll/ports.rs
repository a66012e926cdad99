//! Collaborator traits for the poll tracker.
//!
//! `weft-infra` provides the SQLite store and the HTTP publisher; record
//! sources are provided per trigger kind by the integrations themselves.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use weft_types::error::{PublishError, RepositoryError, SourceError};
use weft_types::poll::{ExecuteWorkflowTask, PollSchedule, PolledRecord, ScheduleKey};

/// Durable poll-schedule state.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get(&self, key: &ScheduleKey) -> Result<Option<PollSchedule>, RepositoryError>;

    /// Fetch the schedule for `key`, creating it from `template` when absent.
    /// Idempotent: an existing schedule (and its cursor) is never overwritten.
    async fn get_or_create(&self, template: PollSchedule) -> Result<PollSchedule, RepositoryError>;

    /// Persist the end-of-tick state: new cursor plus checked-at timestamp,
    /// in one write.
    async fn save_cursor(
        &self,
        key: &ScheduleKey,
        cursor: &str,
        checked_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// All active schedules, for the tick loop to filter by due time.
    async fn list_active(&self) -> Result<Vec<PollSchedule>, RepositoryError>;
}

/// Enqueues workflow-run tasks with the control plane.
#[async_trait]
pub trait TaskPublisher: Send + Sync {
    async fn enqueue(
        &self,
        workspace_id: Uuid,
        task: ExecuteWorkflowTask,
    ) -> Result<(), PublishError>;
}

/// Fetches candidate records from one external source.
///
/// The stored cursor is passed so the source can filter server-side when the
/// upstream API supports it; the tracker re-filters regardless, so a source
/// that ignores the cursor and returns everything is still correct.
#[async_trait]
pub trait PollRecordSource: Send + Sync {
    async fn fetch_candidates(
        &self,
        schedule: &PollSchedule,
        cursor: &str,
    ) -> Result<Vec<PolledRecord>, SourceError>;
}
