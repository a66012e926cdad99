//! The poll tick: new-record detection and cursor advancement.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use weft_types::error::PollError;
use weft_types::poll::{ExecuteWorkflowTask, PollSchedule, PolledRecord, ScheduleKey};

use super::cursor::{compare_ordering_keys, is_after_cursor};
use super::ports::{PollRecordSource, ScheduleStore, TaskPublisher};

/// Drives poll ticks for all triggers on this executor.
///
/// One tracker instance serves every schedule. Ticks for different keys run
/// freely in parallel; ticks for the same key serialize on a per-key async
/// mutex, so a slow source can never let two ticks race on one cursor.
///
/// Delivery is at-least-once: the cursor advances only through the
/// contiguous prefix of successfully enqueued records, so a record whose
/// enqueue failed is re-delivered on the next tick. Duplicates are possible
/// after a partial failure; silent loss is not.
pub struct PollCursorTracker {
    store: Arc<dyn ScheduleStore>,
    publisher: Arc<dyn TaskPublisher>,
    /// Per-key tick locks. Entries for missing or inactive schedules are
    /// evicted inside `tick`; such ticks perform no writes, so a waiter
    /// still holding an evicted lock cannot race a live tick.
    ticks_in_flight: DashMap<ScheduleKey, Arc<Mutex<()>>>,
}

impl PollCursorTracker {
    pub fn new(store: Arc<dyn ScheduleStore>, publisher: Arc<dyn TaskPublisher>) -> Self {
        Self {
            store,
            publisher,
            ticks_in_flight: DashMap::new(),
        }
    }

    /// Run one tick for a trigger and return the persisted cursor.
    ///
    /// Eligibility is timestamp-based on the first-ever tick (records
    /// observed before the schedule was created are never delivered) and
    /// ordering-key-based afterwards. Eligible records are enqueued in
    /// ascending key order; the new cursor and checked-at timestamp are
    /// written exactly once, at the end.
    pub async fn tick(
        &self,
        key: &ScheduleKey,
        source: &dyn PollRecordSource,
        cancel: &CancellationToken,
    ) -> Result<String, PollError> {
        let tick_lock = self
            .ticks_in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _serialized = tick_lock.lock().await;

        let schedule = self
            .store
            .get(key)
            .await
            .map_err(|source| PollError::Store {
                key: key.to_string(),
                source,
            })?;
        let Some(schedule) = schedule else {
            // Deleted schedules never tick again; drop their lock entry so
            // the map does not grow with every key ever seen. A waiter still
            // holding the old Arc re-checks the store itself and also does
            // no writes.
            self.ticks_in_flight.remove(key);
            return Err(PollError::ScheduleNotFound {
                key: key.to_string(),
            });
        };

        if !schedule.is_active {
            debug!(key = %key, "schedule inactive, skipping tick");
            self.ticks_in_flight.remove(key);
            return Ok(schedule.cursor);
        }

        let candidates = source
            .fetch_candidates(&schedule, &schedule.cursor)
            .await
            .map_err(|source| PollError::Source {
                key: key.to_string(),
                source,
            })?;

        let mut eligible = self.filter_eligible(&schedule, candidates);
        eligible.sort_by(|a, b| compare_ordering_keys(&a.ordering_key, &b.ordering_key));

        debug!(
            key = %key,
            eligible = eligible.len(),
            bootstrap = schedule.is_bootstrap(),
            "poll tick fetched candidates"
        );

        let mut cursor = schedule.cursor.clone();
        let mut prefix_intact = true;
        let mut enqueued = 0usize;
        for record in eligible {
            if cancel.is_cancelled() {
                // Persist what was delivered so cancellation never replays
                // the already-enqueued prefix.
                self.persist(key, &cursor).await?;
                return Err(PollError::Cancelled {
                    key: key.to_string(),
                });
            }

            let task = ExecuteWorkflowTask {
                workspace_id: schedule.workspace_id,
                workflow_id: schedule.workflow_id,
                trigger_node_id: schedule.trigger_id.clone(),
                payload: record.payload,
            };
            match self.publisher.enqueue(schedule.workspace_id, task).await {
                Ok(()) => {
                    enqueued += 1;
                    if prefix_intact {
                        cursor = record.ordering_key;
                    }
                }
                Err(err) => {
                    // Later records are still attempted, but the cursor must
                    // not pass this key so it is re-delivered next tick.
                    warn!(
                        key = %key,
                        ordering_key = record.ordering_key,
                        error = %err,
                        "task enqueue failed, holding cursor"
                    );
                    prefix_intact = false;
                }
            }
        }

        self.persist(key, &cursor).await?;
        debug!(key = %key, enqueued, cursor, "poll tick complete");
        Ok(cursor)
    }

    fn filter_eligible(
        &self,
        schedule: &PollSchedule,
        candidates: Vec<PolledRecord>,
    ) -> Vec<PolledRecord> {
        if schedule.is_bootstrap() {
            candidates
                .into_iter()
                .filter(|record| record.observed_at >= schedule.schedule_created_at)
                .collect()
        } else {
            candidates
                .into_iter()
                .filter(|record| is_after_cursor(&record.ordering_key, &schedule.cursor))
                .collect()
        }
    }

    async fn persist(&self, key: &ScheduleKey, cursor: &str) -> Result<(), PollError> {
        self.store
            .save_cursor(key, cursor, Utc::now())
            .await
            .map_err(|source| PollError::Store {
                key: key.to_string(),
                source,
            })
    }
}

impl std::fmt::Debug for PollCursorTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollCursorTracker")
            .field("ticks_in_flight", &self.ticks_in_flight.len())
            .finish()
    }
}
