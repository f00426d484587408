//! Configuration records populated by [`crate::builder`] (§6 of the design).
//!
//! These are plain structs, not closures: the fluent builder in `builder.rs`
//! populates them and the saga only ever reads them.

use crate::providers::CustomValidation;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Options governing the distributed lock for one migration.
#[derive(Debug, Clone)]
pub struct LockOptions {
    pub timeout: Duration,
    /// `Duration::ZERO` disables the heartbeat.
    pub heartbeat_interval: Duration,
    pub lease_duration: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            lease_duration: Duration::from_secs(30),
        }
    }
}

/// What the [`crate::backup::BackupCoordinator`] should ask the provider to include.
#[derive(Debug, Clone, Default)]
pub struct BackupConfiguration {
    pub include_snapshots: bool,
    pub include_terminated_streams: bool,
    pub compress: bool,
    pub retention: Option<Duration>,
}

/// Which checks [`crate::verifier::Verifier`] should run.
#[derive(Clone)]
pub struct VerificationConfiguration {
    pub compare_event_counts: bool,
    pub compare_checksums: bool,
    pub validate_transformations: bool,
    pub sample_size: usize,
    pub verify_stream_integrity: bool,
    pub fail_fast: bool,
    /// User-supplied checks run after the four built-in ones, in order.
    pub custom_validations: Vec<Arc<dyn CustomValidation>>,
}

impl Default for VerificationConfiguration {
    fn default() -> Self {
        Self {
            compare_event_counts: true,
            compare_checksums: true,
            validate_transformations: true,
            sample_size: 100,
            verify_stream_integrity: true,
            fail_fast: false,
            custom_validations: Vec::new(),
        }
    }
}

impl std::fmt::Debug for VerificationConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationConfiguration")
            .field("compare_event_counts", &self.compare_event_counts)
            .field("compare_checksums", &self.compare_checksums)
            .field("validate_transformations", &self.validate_transformations)
            .field("sample_size", &self.sample_size)
            .field("verify_stream_integrity", &self.verify_stream_integrity)
            .field("fail_fast", &self.fail_fast)
            .field("custom_validations", &self.custom_validations.len())
            .finish()
    }
}

/// Book-close annotation options (§4.6).
#[derive(Debug, Clone, Default)]
pub struct BookCloseConfiguration {
    pub reason: Option<String>,
    pub create_snapshot: bool,
    pub archive_location: Option<String>,
    pub deleted: bool,
    pub metadata: HashMap<String, String>,
}

/// Progress-reporting cadence and callback configuration.
#[derive(Debug, Clone)]
pub struct ProgressConfiguration {
    pub report_interval: Duration,
    pub enable_logging: bool,
}

impl Default for ProgressConfiguration {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(5),
            enable_logging: true,
        }
    }
}

/// Options for [`crate::live::LiveMigrationExecutor`] (§4.7).
#[derive(Debug, Clone)]
pub struct LiveMigrationOptions {
    pub max_iterations: u32,
    pub min_sleep_between_iterations: Duration,
    pub close_timeout: Duration,
}

impl Default for LiveMigrationOptions {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            min_sleep_between_iterations: Duration::from_millis(100),
            close_timeout: Duration::from_secs(30),
        }
    }
}

/// Options for [`crate::bulk::BulkCoordinator`] (§4.8).
#[derive(Debug, Clone)]
pub struct BulkConfiguration {
    pub max_concurrency: usize,
    pub continue_on_error: bool,
}

impl Default for BulkConfiguration {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            continue_on_error: true,
        }
    }
}
