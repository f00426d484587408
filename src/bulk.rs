//! Bounded-concurrency fan-out over many objects (§4.8).

use crate::builder::MigrationRecipeBuilder;
use crate::config::{BackupConfiguration, BookCloseConfiguration, BulkConfiguration, LockOptions, VerificationConfiguration};
use crate::error::{Error, Result};
use crate::executor::MigrationExecutor;
use crate::ids::StreamIdentifier;
use crate::model::{MigrationResult, MigrationStatistics, ObjectDocument};
use crate::providers::{BackupProvider, DataStore, DistributedLockProvider, DocumentStore, Transformer};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default target-stream suffix, `{sourceId}-migrated-{uuid}`.
pub type StreamIdFactory = Arc<dyn Fn(&ObjectDocument) -> StreamIdentifier + Send + Sync>;
/// Callback invoked once per settled item with a running tally.
pub type BulkProgressCallback = Arc<dyn Fn(&BulkMigrationProgress) + Send + Sync>;

/// A point-in-time snapshot of the fan-out's progress.
#[derive(Debug, Clone)]
pub struct BulkMigrationProgress {
    pub total: u64,
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub current_object_id: Option<crate::ids::ObjectId>,
}

/// One per-document failure, as surfaced in [`BulkMigrationResult`].
#[derive(Debug, Clone)]
pub struct BulkMigrationFailure {
    pub object_id: crate::ids::ObjectId,
    pub object_name: String,
    pub message: String,
    pub error_kind: String,
}

/// Aggregate outcome of a bulk fan-out.
#[derive(Debug, Clone)]
pub struct BulkMigrationResult {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub statistics: MigrationStatistics,
    pub failures: Vec<BulkMigrationFailure>,
    /// Concatenation of up to the first three failures, `None` when `failures` is empty.
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Shared, per-item configuration threaded into every single-object recipe.
///
/// There is deliberately no `live` field: bulk fan-out and live migration
/// are mutually exclusive (§4.8), so the combination is rejected by
/// construction rather than checked at runtime.
pub struct BulkMigrationRecipe {
    pub documents: Vec<ObjectDocument>,
    pub transformer: Option<Arc<dyn Transformer>>,
    pub lock_options: Option<LockOptions>,
    pub backup: Option<BackupConfiguration>,
    pub book_close: Option<BookCloseConfiguration>,
    pub verification: Option<VerificationConfiguration>,
    pub supports_rollback: bool,
    pub data_store: Arc<dyn DataStore>,
    pub document_store: Arc<dyn DocumentStore>,
    pub lock_provider: Option<Arc<dyn DistributedLockProvider>>,
    pub backup_provider: Option<Arc<dyn BackupProvider>>,
    pub target_stream_id_factory: StreamIdFactory,
    pub bulk: BulkConfiguration,
    pub on_bulk_progress: Option<BulkProgressCallback>,
}

impl BulkMigrationRecipe {
    /// Rejects a `target_stream_id_factory` that does not produce a distinct
    /// identifier per document when more than one document is present (see
    /// the Open Question resolution in the design notes).
    fn validate(&self) -> Result<()> {
        if self.documents.is_empty() {
            return Err(Error::PreconditionViolated(
                "bulk migration requires at least one document".to_string(),
            ));
        }
        if self.documents.len() > 1 {
            let mut seen = std::collections::HashSet::new();
            for doc in &self.documents {
                let id = (self.target_stream_id_factory)(doc);
                if !seen.insert(id) {
                    return Err(Error::PreconditionViolated(
                        "target stream identifier factory must be distinct per document"
                            .to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Default factory: `{sourceId}-migrated-{uuid}`.
pub fn default_target_stream_id_factory() -> StreamIdFactory {
    Arc::new(|doc: &ObjectDocument| {
        StreamIdentifier::new(format!(
            "{}-migrated-{}",
            doc.active.stream_identifier,
            uuid::Uuid::new_v4()
        ))
    })
}

/// Runs one [`MigrationExecutor`] per document under a bounded semaphore.
pub struct BulkCoordinator;

impl BulkCoordinator {
    pub async fn run(recipe: BulkMigrationRecipe) -> Result<BulkMigrationResult> {
        recipe.validate()?;

        let total = recipe.documents.len() as u64;
        let semaphore = Arc::new(Semaphore::new(recipe.bulk.max_concurrency.max(1)));
        let processed = Arc::new(AtomicU64::new(0));
        let successful = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));
        let cancelled = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let recipe = Arc::new(recipe);
        let started_at = Utc::now();

        let mut handles = Vec::with_capacity(recipe.documents.len());
        for doc in recipe.documents.clone() {
            let recipe = recipe.clone();
            let semaphore = semaphore.clone();
            let processed = processed.clone();
            let successful = successful.clone();
            let failed = failed.clone();
            let cancelled = cancelled.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                if cancelled.load(Ordering::SeqCst) {
                    return None;
                }

                let outcome = Self::run_one(&recipe, doc.clone()).await;

                let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                let is_success = outcome.as_ref().map(|r| r.success).unwrap_or(false);
                if is_success {
                    successful.fetch_add(1, Ordering::SeqCst);
                } else {
                    failed.fetch_add(1, Ordering::SeqCst);
                    if !recipe.bulk.continue_on_error {
                        cancelled.store(true, Ordering::SeqCst);
                    }
                }

                if let Some(callback) = &recipe.on_bulk_progress {
                    callback(&BulkMigrationProgress {
                        total,
                        processed: done,
                        successful: successful.load(Ordering::SeqCst),
                        failed: failed.load(Ordering::SeqCst),
                        current_object_id: Some(doc.object_id.clone()),
                    });
                }

                Some((doc, outcome))
            }));
        }

        let mut statistics = MigrationStatistics::default();
        let mut failures = Vec::new();
        let mut completed_at = started_at;

        for handle in handles {
            let Some((doc, outcome)) = handle.await.map_err(|e| Error::Internal(e.to_string()))? else {
                continue;
            };
            match outcome {
                Ok(result) => {
                    if result.success {
                        statistics.total_events += result.statistics.total_events;
                        statistics.events_transformed += result.statistics.events_transformed;
                        statistics.transformation_failures += result.statistics.transformation_failures;
                        statistics.total_bytes += result.statistics.total_bytes;
                        statistics.rolled_back |= result.statistics.rolled_back;
                        statistics.snapshot_created |= result.statistics.snapshot_created;
                        if let Some(at) = result.statistics.completed_at {
                            if at > completed_at {
                                completed_at = at;
                            }
                        }
                    } else {
                        failures.push(BulkMigrationFailure {
                            object_id: doc.object_id,
                            object_name: doc.object_name,
                            message: result.error_message.clone().unwrap_or_default(),
                            error_kind: result.error_kind.clone().unwrap_or_default(),
                        });
                    }
                }
                Err(err) => {
                    failures.push(BulkMigrationFailure {
                        object_id: doc.object_id,
                        object_name: doc.object_name,
                        message: err.to_string(),
                        error_kind: err.kind().to_string(),
                    });
                }
            }
        }

        if statistics.total_events > 0 {
            let elapsed = (completed_at - started_at).num_milliseconds().max(1) as f64 / 1000.0;
            statistics.average_events_per_second = statistics.events_transformed as f64 / elapsed;
        }
        statistics.started_at = Some(started_at);
        statistics.completed_at = Some(completed_at);

        let error_message = if failures.is_empty() {
            None
        } else {
            Some(
                failures
                    .iter()
                    .take(3)
                    .map(|f| format!("{}: {}", f.object_id, f.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };

        Ok(BulkMigrationResult {
            total,
            successful: successful.load(Ordering::SeqCst),
            failed: failed.load(Ordering::SeqCst),
            statistics,
            failures,
            error_message,
            started_at: Some(started_at),
            completed_at: Some(completed_at),
        })
    }

    async fn run_one(
        recipe: &BulkMigrationRecipe,
        doc: ObjectDocument,
    ) -> Result<MigrationResult> {
        let target_stream_id = (recipe.target_stream_id_factory)(&doc);

        let mut builder =
            MigrationRecipeBuilder::new(doc, recipe.data_store.clone(), recipe.document_store.clone())
                .copy_to_new_stream(target_stream_id);

        if let Some(transformer) = &recipe.transformer {
            builder = builder.with_transformation(transformer.clone());
        }
        if let (Some(options), Some(provider)) = (&recipe.lock_options, &recipe.lock_provider) {
            builder = builder.with_distributed_lock(options.clone(), provider.clone());
        }
        if let (Some(config), Some(provider)) = (&recipe.backup, &recipe.backup_provider) {
            builder = builder.with_backup(config.clone(), provider.clone());
        }
        if let Some(config) = &recipe.book_close {
            builder = builder.with_book_closing(config.clone());
        }
        if let Some(config) = &recipe.verification {
            builder = builder.with_verification(config.clone());
        }
        if recipe.supports_rollback {
            builder = builder.with_rollback_support();
        }

        let single_recipe = builder.build()?;
        MigrationExecutor::run(single_recipe).await
    }
}
