//! Core data model (§3 of the design).

use crate::ids::{BackupId, EventVersion, MigrationId, ObjectId, PlanId, StreamIdentifier};
use crate::status::{MigrationPhase, MigrationStatus, Severity};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A single immutable event in a stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Zero-based, contiguous position within its stream.
    pub event_version: EventVersion,
    pub event_type: String,
    pub schema_version: u32,
    pub timestamp: DateTime<Utc>,
    pub payload: Bytes,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Storage routing and chunking details for one stream incarnation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamInfo {
    pub stream_identifier: StreamIdentifier,
    /// `max(eventVersion)` on a non-empty stream, or `-1` when empty.
    pub current_version: i64,
    /// Names of the storage connections/routing targets this stream uses.
    pub connection_names: Vec<String>,
    pub store_type: String,
    pub chunk_size: u32,
    #[serde(default)]
    pub snapshots: Vec<String>,
}

impl StreamInfo {
    /// Builds the `StreamInfo` for a freshly constructed, empty target stream
    /// that otherwise mirrors the source's routing (§4.6).
    pub fn empty_target_like(source: &StreamInfo, target_id: StreamIdentifier) -> Self {
        Self {
            stream_identifier: target_id,
            current_version: -1,
            connection_names: source.connection_names.clone(),
            store_type: source.store_type.clone(),
            chunk_size: source.chunk_size,
            snapshots: Vec::new(),
        }
    }
}

/// Record of a stream that is no longer the active incarnation of an object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerminatedStream {
    pub stream_identifier: StreamIdentifier,
    pub reason: String,
    pub continuation_stream_id: StreamIdentifier,
    pub termination_date: DateTime<Utc>,
    pub stream_version: i64,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// The persisted document describing one logical object and its active stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectDocument {
    pub object_id: ObjectId,
    pub object_name: String,
    pub active: StreamInfo,
    #[serde(default)]
    pub terminated_streams: Vec<TerminatedStream>,
    pub schema_version: u32,
    pub hash: String,
    pub prev_hash: String,
}

/// Accumulated statistics for one migration invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationStatistics {
    pub total_events: u64,
    pub events_transformed: u64,
    pub transformation_failures: u64,
    pub average_events_per_second: f64,
    pub total_bytes: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rolled_back: bool,
    pub snapshot_created: bool,
}

/// A structured check performed by the [`crate::verifier::Verifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
    #[serde(default)]
    pub details: HashMap<String, String>,
}

/// Aggregate verification outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub summary: String,
    pub checks: Vec<VerificationCheck>,
}

/// A single source-event-type sample examined during a dry run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationFailureSample {
    pub event_version: EventVersion,
    pub event_type: String,
    pub reason: String,
}

/// Read-only analysis of the source stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamAnalysis {
    pub event_count: u64,
    pub estimated_size_bytes: u64,
    pub type_distribution: HashMap<String, u64>,
    pub current_version: i64,
}

/// Result of sampling the configured transformer over the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformationSimulation {
    pub sampled: u64,
    pub successes: u64,
    pub failures: Vec<TransformationFailureSample>,
}

/// A coarse cost estimate for running the migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub estimated_duration: Duration,
    pub estimated_bandwidth_bytes: u64,
}

/// One feasibility risk surfaced by the dry-run planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub mitigation: String,
}

/// Feasibility plan produced by a dry run (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub plan_id: PlanId,
    pub source_analysis: StreamAnalysis,
    pub transformation_simulation: Option<TransformationSimulation>,
    pub resource_estimate: ResourceEstimate,
    pub prerequisites: Vec<String>,
    pub risks: Vec<Risk>,
    pub recommended_phases: Vec<String>,
    pub is_feasible: bool,
}

/// Handle to a backup snapshot taken before mutating the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupHandle {
    pub backup_id: BackupId,
    pub provider_name: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub object_id: ObjectId,
    pub stream_version: i64,
    pub event_count: u64,
    pub size_bytes: u64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A point-in-time snapshot of a migration's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationProgress {
    pub migration_id: MigrationId,
    pub status: MigrationStatus,
    pub phase: MigrationPhase,
    pub percent: f64,
    pub events_processed: u64,
    pub total_events: u64,
    pub events_per_second: f64,
    pub elapsed: Duration,
    pub estimated_remaining: Option<Duration>,
    pub is_paused: bool,
    pub can_pause: bool,
    pub can_rollback: bool,
    #[serde(default)]
    pub custom_metrics: HashMap<String, f64>,
    pub error_message: Option<String>,
}

/// The outcome of a single migration invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub migration_id: MigrationId,
    pub success: bool,
    pub status: MigrationStatus,
    pub error_message: Option<String>,
    /// Stable error-kind tag, see [`crate::error::Error::kind`].
    pub error_kind: Option<String>,
    pub progress: MigrationProgress,
    pub verification_result: Option<VerificationResult>,
    pub plan: Option<MigrationPlan>,
    pub duration: Duration,
    pub statistics: MigrationStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            event_version: 1,
            event_type: "Created".to_string(),
            schema_version: 1,
            timestamp: Utc::now(),
            payload: Bytes::from_static(b"{\"id\":1}"),
            metadata: HashMap::new(),
        }
    }

    /// Events cross the process boundary as JSON (book-close metadata,
    /// progress callbacks forwarded to an external API); the derived
    /// `Serialize`/`Deserialize` impls must round-trip through it exactly.
    #[test]
    fn event_round_trips_through_json() {
        let original = event();
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn verification_check_missing_details_defaults_to_empty_map() {
        let decoded: VerificationCheck =
            serde_json::from_str(r#"{"name":"CompareEventCounts","passed":true,"message":"ok"}"#)
                .unwrap();
        assert!(decoded.details.is_empty());
    }
}
