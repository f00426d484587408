//! In-memory fakes for the provider traits, used by this crate's own tests
//! and available to downstream integration tests. Modeled on `vdb-storage`'s
//! segment-file fixtures, minus the filesystem: everything here lives in a
//! `tokio::sync::Mutex`-guarded map.

use crate::error::{Error, Result};
use crate::ids::{EventVersion, LockKey, ObjectId};
use crate::model::{BackupHandle, Event, ObjectDocument, VerificationCheck};
use crate::providers::{
    BackupContext, BackupProvider, CustomValidation, DataStore, DistributedLock,
    DistributedLockProvider, DocumentStore, RestoreContext, Transformer,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// An in-memory, per-stream event log keyed by stream identifier.
#[derive(Default)]
pub struct InMemoryDataStore {
    streams: Mutex<HashMap<String, Vec<Event>>>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `stream_id` with `events`, replacing any existing content.
    pub async fn seed(&self, stream_id: impl Into<String>, events: Vec<Event>) {
        self.streams.lock().await.insert(stream_id.into(), events);
    }

    /// Appends `events` onto whatever `stream_id` already holds, simulating
    /// a concurrent writer racing the migration loop.
    pub async fn seed_append(&self, stream_id: impl Into<String>, events: Vec<Event>) {
        self.streams
            .lock()
            .await
            .entry(stream_id.into())
            .or_default()
            .extend(events);
    }

    pub async fn events_of(&self, stream_id: &str) -> Vec<Event> {
        self.streams
            .lock()
            .await
            .get(stream_id)
            .cloned()
            .unwrap_or_default()
    }

    fn resolve<'a>(doc: &'a ObjectDocument, stream_override: Option<&'a str>) -> &'a str {
        stream_override.unwrap_or(doc.active.stream_identifier.as_str())
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn read(
        &self,
        doc: &ObjectDocument,
        stream_override: Option<&str>,
        start_version: Option<EventVersion>,
        until_version: Option<EventVersion>,
    ) -> Result<Vec<Event>> {
        let stream_id = Self::resolve(doc, stream_override);
        let events = self
            .streams
            .lock()
            .await
            .get(stream_id)
            .cloned()
            .unwrap_or_default();
        Ok(events
            .into_iter()
            .filter(|e| start_version.map_or(true, |s| e.event_version >= s))
            .filter(|e| until_version.map_or(true, |u| e.event_version <= u))
            .collect())
    }

    async fn append(
        &self,
        doc: &ObjectDocument,
        stream_override: Option<&str>,
        events: Vec<Event>,
    ) -> Result<()> {
        let stream_id = Self::resolve(doc, stream_override).to_string();
        self.streams.lock().await.entry(stream_id).or_default().extend(events);
        Ok(())
    }

    async fn append_if_version(
        &self,
        _doc: &ObjectDocument,
        stream_override: &str,
        expected_version: i64,
        events: Vec<Event>,
    ) -> Result<bool> {
        let mut guard = self.streams.lock().await;
        let entry = guard.entry(stream_override.to_string()).or_default();
        let current_version = entry.last().map_or(-1, |e| e.event_version as i64);
        if current_version != expected_version {
            return Ok(false);
        }
        entry.extend(events);
        Ok(true)
    }
}

/// An in-memory document store keyed by `(object_name, object_id)`.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: Mutex<HashMap<(String, String), ObjectDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, doc: ObjectDocument) {
        let key = (doc.object_name.clone(), doc.object_id.as_str().to_string());
        self.docs.lock().await.insert(key, doc);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, object_name: &str, object_id: &ObjectId) -> Result<ObjectDocument> {
        self.docs
            .lock()
            .await
            .get(&(object_name.to_string(), object_id.as_str().to_string()))
            .cloned()
            .ok_or_else(|| Error::Internal(format!("document {object_id} not found")))
    }

    async fn set(&self, doc: &ObjectDocument) -> Result<()> {
        let key = (doc.object_name.clone(), doc.object_id.as_str().to_string());
        self.docs.lock().await.insert(key, doc.clone());
        Ok(())
    }
}

struct InMemoryLockState {
    held: bool,
    expired: bool,
}

/// An in-memory distributed lock provider: one holder per key at a time.
#[derive(Default, Clone)]
pub struct InMemoryLockProvider {
    locks: Arc<Mutex<HashMap<LockKey, InMemoryLockState>>>,
}

impl InMemoryLockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the lease for `key` to look lost on the next renew, without
    /// releasing it — simulates a backend-side expiry racing the heartbeat.
    pub async fn force_expire(&self, key: &LockKey) {
        if let Some(state) = self.locks.lock().await.get_mut(key) {
            state.expired = true;
        }
    }
}

#[async_trait]
impl DistributedLockProvider for InMemoryLockProvider {
    async fn acquire(
        &self,
        key: &LockKey,
        timeout_duration: Duration,
    ) -> Result<Option<Box<dyn DistributedLock>>> {
        let deadline = tokio::time::Instant::now() + timeout_duration;
        loop {
            {
                let mut guard = self.locks.lock().await;
                let state = guard
                    .entry(key.clone())
                    .or_insert(InMemoryLockState { held: false, expired: false });
                if !state.held {
                    state.held = true;
                    state.expired = false;
                    return Ok(Some(Box::new(InMemoryLock {
                        key: key.clone(),
                        locks: self.locks.clone(),
                        valid: Arc::new(AtomicBool::new(true)),
                    })));
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            if timeout(Duration::from_millis(5), tokio::time::sleep(Duration::from_millis(5)))
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }
}

struct InMemoryLock {
    key: LockKey,
    locks: Arc<Mutex<HashMap<LockKey, InMemoryLockState>>>,
    valid: Arc<AtomicBool>,
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn renew(&self) -> Result<bool> {
        let guard = self.locks.lock().await;
        if let Some(state) = guard.get(&self.key) {
            if state.expired {
                self.valid.store(false, Ordering::SeqCst);
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn release(&self) {
        let mut guard = self.locks.lock().await;
        if let Some(state) = guard.get_mut(&self.key) {
            state.held = false;
            state.expired = false;
        }
        self.valid.store(false, Ordering::SeqCst);
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn key(&self) -> &LockKey {
        &self.key
    }
}

/// A backup provider that stores the full event list in memory and restores
/// it verbatim.
#[derive(Default)]
pub struct InMemoryBackupProvider {
    handles: Mutex<HashMap<String, Vec<Event>>>,
}

impl InMemoryBackupProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackupProvider for InMemoryBackupProvider {
    fn provider_name(&self) -> &str {
        "in-memory"
    }

    async fn backup(&self, ctx: BackupContext) -> Result<BackupHandle> {
        let backup_id = uuid::Uuid::new_v4().to_string();
        let size_bytes = ctx.events.iter().map(|e| e.payload.len() as u64).sum();
        let event_count = ctx.events.len() as u64;
        self.handles.lock().await.insert(backup_id.clone(), ctx.events);
        Ok(BackupHandle {
            backup_id: crate::ids::BackupId::new(backup_id),
            provider_name: "in-memory".to_string(),
            location: "memory://backups".to_string(),
            created_at: Utc::now(),
            object_id: ctx.document.object_id,
            stream_version: ctx.document.active.current_version,
            event_count,
            size_bytes,
            metadata: HashMap::new(),
        })
    }

    async fn restore(&self, handle: &BackupHandle, _ctx: RestoreContext) -> Result<()> {
        let exists = self.handles.lock().await.contains_key(handle.backup_id.as_str());
        if exists {
            Ok(())
        } else {
            Err(Error::BackupFailed(format!(
                "no such backup: {}",
                handle.backup_id
            )))
        }
    }

    async fn validate(&self, handle: &BackupHandle) -> Result<bool> {
        Ok(self.handles.lock().await.contains_key(handle.backup_id.as_str()))
    }

    async fn delete(&self, handle: &BackupHandle) -> Result<()> {
        self.handles.lock().await.remove(handle.backup_id.as_str());
        Ok(())
    }
}

/// Restored events from a prior backup, for assertions in integration tests.
pub async fn restored_events(provider: &InMemoryBackupProvider, handle: &BackupHandle) -> Vec<Event> {
    provider
        .handles
        .lock()
        .await
        .get(handle.backup_id.as_str())
        .cloned()
        .unwrap_or_default()
}

/// A transformer that renames one event type to another, unchanged otherwise.
pub struct RenameTransformer {
    pub from: String,
    pub to: String,
}

#[async_trait]
impl Transformer for RenameTransformer {
    async fn transform(&self, mut event: Event) -> Result<Event> {
        if event.event_type == self.from {
            event.event_type = self.to.clone();
        }
        Ok(event)
    }
}

/// A transformer that fails on a specific source version, for
/// failure-path tests.
pub struct FailingTransformer {
    pub fail_at_version: EventVersion,
}

#[async_trait]
impl Transformer for FailingTransformer {
    async fn transform(&self, event: Event) -> Result<Event> {
        if event.event_version == self.fail_at_version {
            Err(Error::TransformationFailed {
                object_id: ObjectId::new("unknown"),
                event_version: event.event_version,
                reason: "simulated transformer failure".to_string(),
            })
        } else {
            Ok(event)
        }
    }
}

/// A custom validation that requires the target stream to hold at least
/// `minimum_events` events.
pub struct MinimumEventCountValidation {
    pub minimum_events: usize,
}

#[async_trait]
impl CustomValidation for MinimumEventCountValidation {
    async fn validate(&self, _source: &[Event], target: &[Event]) -> Result<VerificationCheck> {
        let passed = target.len() >= self.minimum_events;
        Ok(VerificationCheck {
            name: "MinimumEventCount".to_string(),
            passed,
            message: if passed {
                format!("target has at least {} events", self.minimum_events)
            } else {
                format!(
                    "target has {} events, expected at least {}",
                    target.len(),
                    self.minimum_events
                )
            },
            details: HashMap::new(),
        })
    }
}
