//! Poll-schedule state and trigger task types.
//!
//! A [`PollSchedule`] is created once when a polling trigger is activated and
//! its cursor is rewritten on every tick. The cursor is an opaque ordering
//! key from the external source; an empty string means the trigger has never
//! completed a tick (bootstrap state).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Schedule key
// ---------------------------------------------------------------------------

/// The logical identity of one polling trigger.
///
/// Ticks for different keys are independent; ticks for the same key must be
/// serialized (the tracker enforces this with a per-key single-flight lock).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleKey {
    pub workspace_id: Uuid,
    pub trigger_id: String,
    pub workflow_id: Uuid,
}

impl std::fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.workspace_id, self.trigger_id, self.workflow_id
        )
    }
}

// ---------------------------------------------------------------------------
// Poll schedule
// ---------------------------------------------------------------------------

/// Persistent state for one polling trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSchedule {
    pub workspace_id: Uuid,
    pub trigger_id: String,
    pub workflow_id: Uuid,
    /// Which poll-source implementation serves this trigger
    /// (e.g. "mail.new_message"). Used by the poll runner to pick a source.
    pub trigger_kind: String,
    /// When the trigger was activated. Records observed before this instant
    /// are never delivered (bootstrap flood protection).
    pub schedule_created_at: DateTime<Utc>,
    /// When the last tick completed. None until the first tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Highest ordering key delivered so far; empty until bootstrap completes.
    #[serde(default)]
    pub cursor: String,
    pub is_active: bool,
    /// Minimum seconds between ticks for this trigger.
    pub polling_gap_seconds: u32,
}

impl PollSchedule {
    /// Create a fresh, active schedule with an empty cursor.
    pub fn new(
        workspace_id: Uuid,
        trigger_id: impl Into<String>,
        workflow_id: Uuid,
        trigger_kind: impl Into<String>,
        polling_gap_seconds: u32,
    ) -> Self {
        Self {
            workspace_id,
            trigger_id: trigger_id.into(),
            workflow_id,
            trigger_kind: trigger_kind.into(),
            schedule_created_at: Utc::now(),
            last_checked_at: None,
            cursor: String::new(),
            is_active: true,
            polling_gap_seconds,
        }
    }

    pub fn key(&self) -> ScheduleKey {
        ScheduleKey {
            workspace_id: self.workspace_id,
            trigger_id: self.trigger_id.clone(),
            workflow_id: self.workflow_id,
        }
    }

    /// Whether the schedule has never completed a tick.
    pub fn is_bootstrap(&self) -> bool {
        self.cursor.is_empty()
    }

    /// Whether enough time has passed since the last tick to poll again.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_checked_at {
            None => true,
            Some(last) => last + Duration::seconds(i64::from(self.polling_gap_seconds)) <= now,
        }
    }
}

// ---------------------------------------------------------------------------
// Polled records and tasks
// ---------------------------------------------------------------------------

/// One candidate record observed at the external source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolledRecord {
    /// The source's native sequence identifier (e.g. a snowflake id).
    pub ordering_key: String,
    /// The source-side timestamp of the record.
    pub observed_at: DateTime<Utc>,
    /// The record payload handed to the triggered workflow.
    pub payload: Value,
}

/// A "start a workflow run" task enqueued for each newly observed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteWorkflowTask {
    pub workspace_id: Uuid,
    pub workflow_id: Uuid,
    pub trigger_node_id: String,
    pub payload: Value,
}
