//! SQLite schedule store.
//!
//! Implements `ScheduleStore` from `weft-core` using sqlx with split
//! read/write pools. One row per activated polling trigger, keyed by
//! `(workspace_id, trigger_id, workflow_id)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use weft_core::poll::ScheduleStore;
use weft_types::error::RepositoryError;
use weft_types::poll::{PollSchedule, ScheduleKey};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ScheduleStore`.
pub struct SqliteScheduleStore {
    pool: DatabasePool,
}

impl SqliteScheduleStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct ScheduleRow {
    workspace_id: String,
    trigger_id: String,
    workflow_id: String,
    trigger_kind: String,
    schedule_created_at: String,
    last_checked_at: Option<String>,
    cursor: String,
    is_active: bool,
    polling_gap_seconds: i64,
}

impl ScheduleRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            workspace_id: row.try_get("workspace_id")?,
            trigger_id: row.try_get("trigger_id")?,
            workflow_id: row.try_get("workflow_id")?,
            trigger_kind: row.try_get("trigger_kind")?,
            schedule_created_at: row.try_get("schedule_created_at")?,
            last_checked_at: row.try_get("last_checked_at")?,
            cursor: row.try_get("cursor")?,
            is_active: row.try_get("is_active")?,
            polling_gap_seconds: row.try_get("polling_gap_seconds")?,
        })
    }

    fn into_schedule(self) -> Result<PollSchedule, RepositoryError> {
        Ok(PollSchedule {
            workspace_id: parse_uuid(&self.workspace_id)?,
            trigger_id: self.trigger_id,
            workflow_id: parse_uuid(&self.workflow_id)?,
            trigger_kind: self.trigger_kind,
            schedule_created_at: parse_datetime(&self.schedule_created_at)?,
            last_checked_at: self
                .last_checked_at
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
            cursor: self.cursor,
            is_active: self.is_active,
            polling_gap_seconds: self.polling_gap_seconds as u32,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

const SELECT_COLUMNS: &str = "workspace_id, trigger_id, workflow_id, trigger_kind, \
     schedule_created_at, last_checked_at, cursor, is_active, polling_gap_seconds";

// ---------------------------------------------------------------------------
// ScheduleStore impl
// ---------------------------------------------------------------------------

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    async fn get(&self, key: &ScheduleKey) -> Result<Option<PollSchedule>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM poll_schedules \
             WHERE workspace_id = ? AND trigger_id = ? AND workflow_id = ?"
        ))
        .bind(key.workspace_id.to_string())
        .bind(&key.trigger_id)
        .bind(key.workflow_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|r| ScheduleRow::from_row(&r).map_err(|e| RepositoryError::Query(e.to_string())))
            .transpose()?
            .map(ScheduleRow::into_schedule)
            .transpose()
    }

    async fn get_or_create(&self, template: PollSchedule) -> Result<PollSchedule, RepositoryError> {
        // INSERT OR IGNORE keeps an existing row (and its cursor) intact.
        sqlx::query(
            r#"INSERT OR IGNORE INTO poll_schedules
               (workspace_id, trigger_id, workflow_id, trigger_kind,
                schedule_created_at, last_checked_at, cursor, is_active, polling_gap_seconds)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(template.workspace_id.to_string())
        .bind(&template.trigger_id)
        .bind(template.workflow_id.to_string())
        .bind(&template.trigger_kind)
        .bind(format_datetime(&template.schedule_created_at))
        .bind(template.last_checked_at.as_ref().map(format_datetime))
        .bind(&template.cursor)
        .bind(template.is_active)
        .bind(i64::from(template.polling_gap_seconds))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        self.get(&template.key())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_cursor(
        &self,
        key: &ScheduleKey,
        cursor: &str,
        checked_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE poll_schedules SET cursor = ?, last_checked_at = ? \
             WHERE workspace_id = ? AND trigger_id = ? AND workflow_id = ?",
        )
        .bind(cursor)
        .bind(format_datetime(&checked_at))
        .bind(key.workspace_id.to_string())
        .bind(&key.trigger_id)
        .bind(key.workflow_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<PollSchedule>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM poll_schedules WHERE is_active = 1 \
             ORDER BY workspace_id, trigger_id, workflow_id"
        ))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| {
                ScheduleRow::from_row(r)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_schedule()
            })
            .collect()
    }
}
