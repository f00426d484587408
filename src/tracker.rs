//! Progress tracking (§4.2).

use crate::builder::{CompletedCallback, FailedCallback, MetricCollector, ProgressCallback};
use crate::ids::MigrationId;
use crate::model::{MigrationProgress, MigrationResult};
use crate::status::{MigrationPhase, MigrationStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Tracks a single migration's progress with thread-safe, monotonic counters.
pub struct ProgressTracker {
    migration_id: MigrationId,
    started_at: Instant,
    processed: AtomicU64,
    total: AtomicU64,
    status: RwLock<MigrationStatus>,
    phase: RwLock<MigrationPhase>,
    paused: AtomicBool,
    cancelled: AtomicBool,
    error_message: RwLock<Option<String>>,
    custom_metrics: RwLock<HashMap<String, MetricCollector>>,
    supports_pause: bool,
    supports_rollback: bool,
    report_interval: Duration,
    last_report: Mutex<Option<Instant>>,
    on_progress: Option<ProgressCallback>,
    on_completed: Option<CompletedCallback>,
    on_failed: Option<FailedCallback>,
    enable_logging: bool,
}

impl ProgressTracker {
    pub fn new(
        migration_id: MigrationId,
        total: u64,
        supports_pause: bool,
        supports_rollback: bool,
        report_interval: Duration,
        enable_logging: bool,
        on_progress: Option<ProgressCallback>,
        on_completed: Option<CompletedCallback>,
        on_failed: Option<FailedCallback>,
    ) -> Self {
        Self {
            migration_id,
            started_at: Instant::now(),
            processed: AtomicU64::new(0),
            total: AtomicU64::new(total),
            status: RwLock::new(MigrationStatus::Pending),
            phase: RwLock::new(MigrationPhase::Normal),
            paused: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            error_message: RwLock::new(None),
            custom_metrics: RwLock::new(HashMap::new()),
            supports_pause,
            supports_rollback,
            report_interval,
            last_report: Mutex::new(None),
            on_progress,
            on_completed,
            on_failed,
            enable_logging,
        }
    }

    pub fn migration_id(&self) -> &MigrationId {
        &self.migration_id
    }

    pub fn set_status(&self, status: MigrationStatus) {
        *self.status.write().unwrap() = status;
    }

    pub fn set_phase(&self, phase: MigrationPhase) {
        *self.phase.write().unwrap() = phase;
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Marks the migration cancelled; observed cooperatively, once per event
    /// and at phase boundaries, by the running saga.
    pub fn set_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn set_error(&self, message: impl Into<String>) {
        *self.error_message.write().unwrap() = Some(message.into());
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub fn set_custom_metric(&self, name: impl Into<String>, collector: MetricCollector) {
        self.custom_metrics
            .write()
            .unwrap()
            .insert(name.into(), collector);
    }

    /// Advances the processed counter by `n` (monotonic, never decreases).
    pub fn increment_processed(&self, n: u64) {
        self.processed.fetch_add(n, Ordering::SeqCst);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Builds a consistent point-in-time snapshot.
    pub fn get_progress(&self) -> MigrationProgress {
        let processed = self.processed.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);
        let elapsed = self.started_at.elapsed();

        let percent = if total == 0 {
            0.0
        } else {
            (processed as f64 / total as f64) * 100.0
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let events_per_second = if elapsed_secs > 0.0 {
            processed as f64 / elapsed_secs
        } else {
            0.0
        };

        let estimated_remaining = if events_per_second > 0.0 {
            let remaining_events = total.saturating_sub(processed) as f64;
            Some(Duration::from_secs_f64(remaining_events / events_per_second))
        } else {
            None
        };

        let mut custom_metrics = HashMap::new();
        for (name, collector) in self.custom_metrics.read().unwrap().iter() {
            // A misbehaving collector never poisons the snapshot: collectors
            // return `Option<f64>`, and `None` is simply omitted.
            if let Some(value) = collector() {
                custom_metrics.insert(name.clone(), value);
            }
        }

        MigrationProgress {
            migration_id: self.migration_id.clone(),
            status: *self.status.read().unwrap(),
            phase: *self.phase.read().unwrap(),
            percent,
            events_processed: processed,
            total_events: total,
            events_per_second,
            elapsed,
            estimated_remaining,
            is_paused: self.paused.load(Ordering::SeqCst),
            can_pause: self.supports_pause,
            can_rollback: self.supports_rollback,
            custom_metrics,
            error_message: self.error_message.read().unwrap().clone(),
        }
    }

    /// Reports progress to the configured callback, throttled to at most
    /// once per `report_interval`. The first call after the interval
    /// boundary fires.
    pub fn report(&self) {
        let now = Instant::now();
        {
            let mut last = self.last_report.lock().unwrap();
            if let Some(prev) = *last {
                if now.duration_since(prev) < self.report_interval {
                    return;
                }
            }
            *last = Some(now);
        }

        let snapshot = self.get_progress();
        if self.enable_logging {
            info!(
                migration_id = %snapshot.migration_id,
                status = ?snapshot.status,
                percent = snapshot.percent,
                events_processed = snapshot.events_processed,
                total_events = snapshot.total_events,
                "migration progress"
            );
        }
        if let Some(callback) = &self.on_progress {
            callback(&snapshot);
        }
    }

    pub fn report_completed(&self, result: &MigrationResult) {
        self.set_status(MigrationStatus::Completed);
        if self.enable_logging {
            info!(migration_id = %self.migration_id, "migration completed");
        }
        if let Some(callback) = &self.on_completed {
            callback(result);
        }
    }

    /// Marks the migration failed, unless compensation already left it in
    /// the terminal `RolledBack` state — that marker must survive, not be
    /// overwritten back to plain `Failed` (§4.6).
    pub fn report_failed(&self, err: &crate::error::Error) {
        if *self.status.read().unwrap() != MigrationStatus::RolledBack {
            self.set_status(MigrationStatus::Failed);
        }
        self.set_error(err.to_string());
        if let Some(callback) = &self.on_failed {
            callback(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(total: u64) -> ProgressTracker {
        ProgressTracker::new(
            MigrationId::new("m1"),
            total,
            true,
            true,
            Duration::from_secs(5),
            false,
            None,
            None,
            None,
        )
    }

    #[test]
    fn percent_is_zero_when_total_is_zero() {
        let t = tracker(0);
        assert_eq!(t.get_progress().percent, 0.0);
    }

    #[test]
    fn percent_tracks_processed_over_total() {
        let t = tracker(4);
        t.increment_processed(1);
        assert_eq!(t.get_progress().percent, 25.0);
        t.increment_processed(3);
        assert_eq!(t.get_progress().percent, 100.0);
    }

    #[test]
    fn processed_never_exceeds_what_was_incremented() {
        let t = tracker(10);
        t.increment_processed(3);
        t.increment_processed(2);
        assert_eq!(t.processed(), 5);
    }

    #[test]
    fn failing_custom_metric_is_omitted_not_fatal() {
        let t = tracker(10);
        t.set_custom_metric("always_none", std::sync::Arc::new(|| None));
        t.set_custom_metric("always_some", std::sync::Arc::new(|| Some(3.0)));
        let snapshot = t.get_progress();
        assert!(!snapshot.custom_metrics.contains_key("always_none"));
        assert_eq!(snapshot.custom_metrics.get("always_some"), Some(&3.0));
    }

    #[test]
    fn report_failed_sets_status_and_message() {
        let t = tracker(10);
        t.report_failed(&crate::error::Error::Cancelled);
        let snapshot = t.get_progress();
        assert_eq!(snapshot.status, MigrationStatus::Failed);
        assert_eq!(snapshot.error_message.as_deref(), Some("migration cancelled"));
    }
}
