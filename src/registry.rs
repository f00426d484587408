//! Process-local directory of active migrations (§4.9).

use crate::ids::MigrationId;
use crate::model::MigrationProgress;
use crate::status::MigrationStatus;
use crate::tracker::ProgressTracker;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe map from migration id to its tracker, for inspection,
/// pause/resume, and cancellation from outside the running saga.
#[derive(Default)]
pub struct MigrationRegistry {
    trackers: RwLock<HashMap<MigrationId, Arc<ProgressTracker>>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tracker: Arc<ProgressTracker>) {
        self.trackers
            .write()
            .unwrap()
            .insert(tracker.migration_id().clone(), tracker);
    }

    pub fn unregister(&self, id: &MigrationId) {
        self.trackers.write().unwrap().remove(id);
    }

    pub fn get(&self, id: &MigrationId) -> Option<Arc<ProgressTracker>> {
        self.trackers.read().unwrap().get(id).cloned()
    }

    pub fn list(&self) -> Vec<MigrationId> {
        self.trackers.read().unwrap().keys().cloned().collect()
    }

    /// Read-only snapshot of every tracked migration's progress.
    pub fn snapshot(&self) -> Vec<MigrationProgress> {
        self.trackers
            .read()
            .unwrap()
            .values()
            .map(|t| t.get_progress())
            .collect()
    }

    /// Sets `paused=true`; the executor observes this cooperatively at phase
    /// boundaries and between events.
    pub fn pause(&self, id: &MigrationId) -> bool {
        match self.get(id) {
            Some(tracker) => {
                tracker.set_paused(true);
                tracker.set_status(MigrationStatus::Paused);
                true
            }
            None => false,
        }
    }

    pub fn resume(&self, id: &MigrationId) -> bool {
        match self.get(id) {
            Some(tracker) => {
                tracker.set_paused(false);
                tracker.set_status(MigrationStatus::InProgress);
                true
            }
            None => false,
        }
    }

    /// Signals cancellation and removes the migration from the registry. The
    /// running saga observes `tracker.is_cancelled()` once per event and at
    /// phase boundaries, and aborts with `Error::Cancelled`.
    pub fn cancel(&self, id: &MigrationId) -> bool {
        let tracker = self.trackers.write().unwrap().remove(id);
        match tracker {
            Some(tracker) => {
                tracker.set_cancelled();
                tracker.set_status(MigrationStatus::Cancelled);
                true
            }
            None => false,
        }
    }
}
