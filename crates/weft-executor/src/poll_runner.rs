//! The periodic sweep that drives poll ticks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use weft_core::poll::{PollCursorTracker, PollRecordSource, ScheduleStore};

/// Sweeps active schedules on a fixed interval and ticks the due ones.
///
/// Sources are registered per trigger kind (e.g. "mail.new_message") by the
/// integrations compiled into this executor; a schedule whose kind has no
/// registered source is skipped with a warning rather than failing the
/// sweep.
pub struct PollRunner {
    store: Arc<dyn ScheduleStore>,
    tracker: Arc<PollCursorTracker>,
    sources: HashMap<String, Arc<dyn PollRecordSource>>,
    tick_interval: Duration,
}

impl PollRunner {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        tracker: Arc<PollCursorTracker>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            tracker,
            sources: HashMap::new(),
            tick_interval,
        }
    }

    /// Register the record source serving one trigger kind. Last
    /// registration wins; kinds are expected to be unique per integration.
    pub fn register_source(
        &mut self,
        trigger_kind: impl Into<String>,
        source: Arc<dyn PollRecordSource>,
    ) {
        let trigger_kind = trigger_kind.into();
        debug!(trigger_kind, "registered poll source");
        self.sources.insert(trigger_kind, source);
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Run until `shutdown` fires. Each interval lists the active schedules
    /// and ticks those whose polling gap has elapsed.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_seconds = self.tick_interval.as_secs(),
            sources = self.sources.len(),
            "poll runner started"
        );
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => self.sweep(&shutdown).await,
            }
        }
        info!("poll runner stopped");
    }

    /// One sweep over the active schedules.
    pub async fn sweep(&self, shutdown: &CancellationToken) {
        let schedules = match self.store.list_active().await {
            Ok(schedules) => schedules,
            Err(err) => {
                error!(error = %err, "failed to list active schedules");
                return;
            }
        };

        let now = Utc::now();
        for schedule in schedules.into_iter().filter(|s| s.is_due(now)) {
            if shutdown.is_cancelled() {
                return;
            }
            let key = schedule.key();
            let Some(source) = self.sources.get(&schedule.trigger_kind) else {
                warn!(
                    key = %key,
                    trigger_kind = schedule.trigger_kind,
                    "no poll source registered for trigger kind, skipping"
                );
                continue;
            };

            match self.tracker.tick(&key, source.as_ref(), shutdown).await {
                Ok(cursor) => debug!(key = %key, cursor, "poll tick ok"),
                Err(err) => warn!(key = %key, error = %err, "poll tick failed"),
            }
        }
    }
}
