//! Fixed status/phase/severity lexicons (§3, §6 of the design).
//!
//! These are serialized with fixed string tags rather than left to derive
//! defaults, since callers outside this crate (and outside this language,
//! per the cross-language interop note in the design) match on the literal
//! strings.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a single migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MigrationStatus {
    Pending,
    InProgress,
    Paused,
    BackingUp,
    Verifying,
    CuttingOver,
    RollingBack,
    Completed,
    Failed,
    Cancelled,
    RolledBack,
}

impl Default for MigrationStatus {
    fn default() -> Self {
        MigrationStatus::Pending
    }
}

/// Where in the multi-incarnation lifecycle a stream currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MigrationPhase {
    Normal,
    DualWrite,
    DualRead,
    Cutover,
    BookClosed,
}

impl Default for MigrationPhase {
    fn default() -> Self {
        MigrationPhase::Normal
    }
}

/// Risk severity reported by the dry-run planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Severity {
    Low,
    Medium,
    High,
}
