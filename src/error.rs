//! Error types for the migration engine.

use crate::ids::{LockKey, ObjectId};
use thiserror::Error;

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller requested cancellation.
    #[error("migration cancelled")]
    Cancelled,

    /// No lock was obtained within the configured timeout.
    #[error("failed to acquire lock {key} within {timeout_ms}ms")]
    LockAcquisitionFailed { key: LockKey, timeout_ms: u64 },

    /// A previously-held lock was lost (heartbeat renew failed).
    #[error("lock {0} was lost")]
    LockLost(LockKey),

    /// Reading events from the source failed.
    #[error("failed to read events for object {object_id}: {reason}")]
    ReadFailed { object_id: ObjectId, reason: String },

    /// Appending events to the target failed.
    #[error("failed to append events for object {object_id}: {reason}")]
    AppendFailed { object_id: ObjectId, reason: String },

    /// Writing the object document failed.
    #[error("failed to write document for object {object_id}: {reason}")]
    DocumentWriteFailed { object_id: ObjectId, reason: String },

    /// A transformer raised an error while transforming an event.
    #[error("transformation failed at version {event_version} for object {object_id}: {reason}")]
    TransformationFailed {
        object_id: ObjectId,
        event_version: u64,
        reason: String,
    },

    /// Verification failed in fail-fast mode.
    #[error("verification failed: {summary}")]
    VerificationFailed { summary: String },

    /// A precondition required before running the saga was violated.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    /// Live migration exhausted its iteration budget without converging.
    #[error("live migration for object {0} did not converge within the iteration budget")]
    LiveMigrationDidNotConverge(ObjectId),

    /// Rollback (compensation) itself failed. The original cause is preserved separately.
    #[error("rollback failed: {0}")]
    RollbackFailed(String),

    /// A backup/restore provider call failed.
    #[error("backup provider error: {0}")]
    BackupFailed(String),

    /// Unexpected internal error; indicates a programmer bug or invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for migration engine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the stable error-kind name used in [`crate::model::MigrationResult`].
    ///
    /// Kept separate from `Display` so downstream callers can match on a
    /// fixed lexicon without parsing message text (see §7 of the design).
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Cancelled => "Cancelled",
            Error::LockAcquisitionFailed { .. } => "LockAcquisitionFailed",
            Error::LockLost(_) => "LockLost",
            Error::ReadFailed { .. } => "ReadFailed",
            Error::AppendFailed { .. } => "AppendFailed",
            Error::DocumentWriteFailed { .. } => "DocumentWriteFailed",
            Error::TransformationFailed { .. } => "TransformationFailed",
            Error::VerificationFailed { .. } => "VerificationFailed",
            Error::PreconditionViolated(_) => "PreconditionViolated",
            Error::LiveMigrationDidNotConverge(_) => "LiveMigrationDidNotConverge",
            Error::RollbackFailed(_) => "RollbackFailed",
            Error::BackupFailed(_) => "BackupFailed",
            Error::Internal(_) => "Internal",
        }
    }
}
