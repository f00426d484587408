//! External collaborator interfaces (§6 of the design).
//!
//! These are the pluggable seams the core consumes but never implements in
//! production form: the concrete data store, document store, distributed
//! lock backend, and backup backend all live outside this crate. Only
//! in-memory fakes for tests live here (see [`crate::testing`]).

use crate::error::Result;
use crate::ids::{EventVersion, LockKey, ObjectId};
use crate::model::{BackupHandle, Event, ObjectDocument, VerificationCheck};
use async_trait::async_trait;
use std::time::Duration;

/// Append-only event storage for a single object's streams.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Reads events for `doc`'s active stream (or `stream_override` if given),
    /// from `start_version` (inclusive) up to `until_version` (inclusive) when
    /// given, otherwise through the current head.
    async fn read(
        &self,
        doc: &ObjectDocument,
        stream_override: Option<&str>,
        start_version: Option<EventVersion>,
        until_version: Option<EventVersion>,
    ) -> Result<Vec<Event>>;

    /// Appends `events` to `doc`'s active stream, or to `stream_override` when
    /// given. Expected to be atomic per batch.
    async fn append(
        &self,
        doc: &ObjectDocument,
        stream_override: Option<&str>,
        events: Vec<Event>,
    ) -> Result<()>;

    /// Appends `events` to `stream_override`, succeeding only if the stream's
    /// current version still equals `expected_version` (optimistic
    /// concurrency, used by live migration's close step). Returns `false` on
    /// a version conflict rather than erroring, so callers can retry.
    async fn append_if_version(
        &self,
        doc: &ObjectDocument,
        stream_override: &str,
        expected_version: i64,
        events: Vec<Event>,
    ) -> Result<bool>;
}

/// Persistence for [`ObjectDocument`] records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, object_name: &str, object_id: &ObjectId) -> Result<ObjectDocument>;
    async fn set(&self, doc: &ObjectDocument) -> Result<()>;
}

/// A lease on a named distributed lock.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Extends the lease. `false` means the lease is lost.
    async fn renew(&self) -> Result<bool>;

    /// Releases the lock. Idempotent; safe to call from any state, including
    /// after the lease was already lost.
    async fn release(&self);

    fn is_valid(&self) -> bool;

    fn key(&self) -> &LockKey;
}

/// A distributed lock backend (blob lease, etc; out of scope to implement here).
#[async_trait]
pub trait DistributedLockProvider: Send + Sync {
    /// Attempts to acquire `key` within `timeout`. Returns `None` if another
    /// holder exists when the timeout elapses.
    async fn acquire(
        &self,
        key: &LockKey,
        timeout: Duration,
    ) -> Result<Option<Box<dyn DistributedLock>>>;
}

/// Context passed to a [`BackupProvider`] when taking a snapshot.
pub struct BackupContext {
    pub document: ObjectDocument,
    pub events: Vec<Event>,
}

/// Context passed to a [`BackupProvider`] when restoring.
pub struct RestoreContext {
    pub target: ObjectDocument,
    pub overwrite: bool,
}

/// A pluggable backup/restore backend.
#[async_trait]
pub trait BackupProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn backup(&self, ctx: BackupContext) -> Result<BackupHandle>;

    async fn restore(&self, handle: &BackupHandle, ctx: RestoreContext) -> Result<()>;

    async fn validate(&self, handle: &BackupHandle) -> Result<bool>;

    async fn delete(&self, handle: &BackupHandle) -> Result<()>;
}

/// A pure mapping from one event to another.
///
/// Implementations may change `event_type`/`payload` but must preserve the
/// incoming `event_version` (version order is never reordered by a
/// transformer).
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, event: Event) -> Result<Event>;
}

/// An ordered composition of [`Transformer`]s, itself a `Transformer`.
pub struct Pipeline {
    stages: Vec<Box<dyn Transformer>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Transformer>>) -> Self {
        Self { stages }
    }
}

#[async_trait]
impl Transformer for Pipeline {
    async fn transform(&self, event: Event) -> Result<Event> {
        let mut current = event;
        for stage in &self.stages {
            current = stage.transform(current).await?;
        }
        Ok(current)
    }
}

/// A user-supplied check run by [`crate::verifier::Verifier`] alongside its
/// four built-in checks (§4.3 `CustomValidations`).
#[async_trait]
pub trait CustomValidation: Send + Sync {
    /// Compares the already-read source and target streams and reports a
    /// named, pass/fail result the same shape as a built-in check.
    async fn validate(&self, source: &[Event], target: &[Event]) -> Result<VerificationCheck>;
}

