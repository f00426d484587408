//! The migration saga: lock, backup, copy-and-transform, verify, cut over,
//! book-close, with compensation on failure (§4.6).

use crate::backup::BackupCoordinator;
use crate::builder::MigrationRecipe;
use crate::cutover::{book_close, cutover};
use crate::error::{Error, Result};
use crate::lock::LockGuard;
use crate::model::{MigrationPlan, MigrationResult, MigrationStatistics};
use crate::planner::DryRunPlanner;
use crate::registry::MigrationRegistry;
use crate::status::{MigrationPhase, MigrationStatus};
use crate::tracker::ProgressTracker;
use crate::verifier::Verifier;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const PAUSE_POLL_BASE: Duration = Duration::from_millis(50);
const PAUSE_POLL_CAP: Duration = Duration::from_secs(2);

/// Runs a single [`MigrationRecipe`] to completion.
pub struct MigrationExecutor;

impl MigrationExecutor {
    /// Executes `recipe`. Always returns `Ok` with a [`MigrationResult`]
    /// describing success or failure; `Err` is reserved for cases where the
    /// result itself cannot be constructed (it is not in steady state).
    pub async fn run(recipe: MigrationRecipe) -> Result<MigrationResult> {
        Self::run_impl(recipe, None).await
    }

    /// Like [`Self::run`], but registers the live [`ProgressTracker`] in
    /// `registry` for the duration of the run so that `registry.pause`,
    /// `registry.resume`, and `registry.cancel` observe and affect this
    /// invocation (§4.9).
    pub async fn run_with_registry(
        recipe: MigrationRecipe,
        registry: &MigrationRegistry,
    ) -> Result<MigrationResult> {
        Self::run_impl(recipe, Some(registry)).await
    }

    async fn run_impl(
        recipe: MigrationRecipe,
        registry: Option<&MigrationRegistry>,
    ) -> Result<MigrationResult> {
        let tracker = Arc::new(ProgressTracker::new(
            recipe.migration_id.clone(),
            0,
            recipe.supports_pause,
            recipe.supports_rollback,
            recipe.progress.report_interval,
            recipe.progress.enable_logging,
            recipe.on_progress.clone(),
            recipe.on_completed.clone(),
            recipe.on_failed.clone(),
        ));
        for (name, collector) in &recipe.custom_metrics {
            tracker.set_custom_metric(name.clone(), collector.clone());
        }

        if let Some(registry) = registry {
            registry.register(tracker.clone());
        }

        let start = Instant::now();
        tracker.set_status(MigrationStatus::InProgress);

        let outcome = Self::run_inner(&recipe, &tracker).await;
        let duration = start.elapsed();

        if let Some(registry) = registry {
            registry.unregister(&recipe.migration_id);
        }

        Ok(match outcome {
            Ok((plan, verification, statistics)) => {
                tracker.set_status(MigrationStatus::Completed);
                let result = MigrationResult {
                    migration_id: recipe.migration_id.clone(),
                    success: true,
                    status: MigrationStatus::Completed,
                    error_message: None,
                    error_kind: None,
                    progress: tracker.get_progress(),
                    verification_result: verification,
                    plan,
                    duration,
                    statistics,
                };
                tracker.report_completed(&result);
                result
            }
            Err((err, plan, statistics)) => {
                tracker.report_failed(&err);
                error!(migration_id = %recipe.migration_id, error = %err, "migration failed");
                MigrationResult {
                    migration_id: recipe.migration_id.clone(),
                    success: false,
                    status: tracker.get_progress().status,
                    error_message: Some(err.to_string()),
                    error_kind: Some(err.kind().to_string()),
                    progress: tracker.get_progress(),
                    verification_result: None,
                    plan,
                    duration,
                    statistics,
                }
            }
        })
    }

    #[allow(clippy::type_complexity)]
    async fn run_inner(
        recipe: &MigrationRecipe,
        tracker: &ProgressTracker,
    ) -> std::result::Result<
        (Option<MigrationPlan>, Option<crate::model::VerificationResult>, MigrationStatistics),
        (Error, Option<MigrationPlan>, MigrationStatistics),
    > {
        let mut statistics = MigrationStatistics {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        if recipe.is_dry_run {
            tracker.set_phase(MigrationPhase::Normal);
            let plan = DryRunPlanner::plan(
                recipe.data_store.as_ref(),
                recipe.document_store.as_ref(),
                &recipe.source_doc,
                recipe.transformer.as_deref(),
                recipe.verification.as_ref().map_or(100, |v| v.sample_size),
                recipe.backup_provider.is_some(),
                true,
            )
            .await
            .map_err(|e| (e, None, statistics.clone()))?;
            statistics.completed_at = Some(Utc::now());
            return Ok((Some(plan), None, statistics));
        }

        let plan = recipe.from_plan.clone();

        let mut lock_guard = if let (Some(options), Some(provider)) =
            (&recipe.lock_options, &recipe.lock_provider)
        {
            let key = crate::ids::LockKey::new(recipe.source_doc.object_id.as_str());
            Some(
                LockGuard::acquire(provider.as_ref(), key, options.timeout, options.heartbeat_interval)
                    .await
                    .map_err(|e| (e, plan.clone(), statistics.clone()))?,
            )
        } else {
            None
        };

        let result =
            Self::run_locked(recipe, tracker, &mut statistics, plan.clone(), lock_guard.as_ref()).await;

        if let Some(guard) = lock_guard.as_mut() {
            guard.release().await;
        }

        result.map_err(|e| (e, plan, statistics))
    }

    async fn run_locked(
        recipe: &MigrationRecipe,
        tracker: &ProgressTracker,
        statistics: &mut MigrationStatistics,
        plan: Option<MigrationPlan>,
        lock_guard: Option<&LockGuard>,
    ) -> Result<(Option<MigrationPlan>, Option<crate::model::VerificationResult>, MigrationStatistics)> {
        let source_events = recipe
            .data_store
            .read(&recipe.source_doc, None, None, None)
            .await
            .map_err(|e| Error::ReadFailed {
                object_id: recipe.source_doc.object_id.clone(),
                reason: e.to_string(),
            })?;
        tracker.set_total(source_events.len() as u64);
        statistics.total_events = source_events.len() as u64;
        Self::check_cancelled(tracker)?;

        let mut backup_handle = None;
        if let (Some(config), Some(provider)) = (&recipe.backup, &recipe.backup_provider) {
            tracker.set_status(MigrationStatus::BackingUp);
            tracker.set_phase(MigrationPhase::Normal);
            let _ = config; // snapshot/compression policy belongs to the provider
            let handle = BackupCoordinator::backup(
                provider.as_ref(),
                recipe.source_doc.clone(),
                source_events.clone(),
            )
            .await;
            match handle {
                Ok(handle) => {
                    statistics.snapshot_created = true;
                    backup_handle = Some(handle);
                }
                Err(err) => return Err(err),
            }
        }

        if let Err(err) = Self::check_cancelled(tracker) {
            if recipe.supports_rollback {
                statistics.rolled_back = true;
                Self::try_rollback(recipe, tracker, backup_handle.as_ref()).await;
            }
            return Err(err);
        }

        if let Some(live_options) = &recipe.live {
            return match Self::run_live(recipe, tracker, statistics, plan.clone(), live_options).await {
                Ok(ok) => Ok(ok),
                Err(err) => {
                    if recipe.supports_rollback {
                        statistics.rolled_back = true;
                        Self::try_rollback(recipe, tracker, backup_handle.as_ref()).await;
                    }
                    Err(err)
                }
            };
        }

        tracker.set_status(MigrationStatus::InProgress);
        tracker.set_phase(MigrationPhase::DualWrite);

        let transformation_fail_fast = recipe.verification.as_ref().is_some_and(|v| v.fail_fast);

        let mut transformed = Vec::with_capacity(source_events.len());
        for event in &source_events {
            Self::wait_while_paused(tracker).await;
            if let Err(err) = Self::check_cancelled(tracker) {
                if recipe.supports_rollback {
                    statistics.rolled_back = true;
                    Self::try_rollback(recipe, tracker, backup_handle.as_ref()).await;
                }
                return Err(err);
            }
            let out = match &recipe.transformer {
                Some(transformer) => transformer.transform(event.clone()).await,
                None => Ok(event.clone()),
            };
            match out {
                Ok(event) => {
                    transformed.push(event);
                    statistics.events_transformed += 1;
                }
                Err(err) => {
                    statistics.transformation_failures += 1;
                    warn!(
                        migration_id = %recipe.migration_id,
                        event_version = event.event_version,
                        error = %err,
                        "transformation failed"
                    );
                    if transformation_fail_fast {
                        if recipe.supports_rollback {
                            statistics.rolled_back = true;
                            Self::try_rollback(recipe, tracker, backup_handle.as_ref()).await;
                        }
                        return Err(err);
                    }
                    // Not FailFast: the event is dropped from the target, the
                    // failure is counted, and the copy continues (§7).
                }
            }
            tracker.increment_processed(1);
            statistics.total_bytes += event.payload.len() as u64;
            tracker.report();
        }

        if let Some(guard) = lock_guard {
            if let Err(err) = guard.check() {
                if recipe.supports_rollback {
                    statistics.rolled_back = true;
                    Self::try_rollback(recipe, tracker, backup_handle.as_ref()).await;
                }
                return Err(err);
            }
        }

        recipe
            .data_store
            .append(&recipe.source_doc, Some(recipe.target_stream_id.as_str()), transformed.clone())
            .await
            .map_err(|e| Error::AppendFailed {
                object_id: recipe.source_doc.object_id.clone(),
                reason: e.to_string(),
            })?;

        let elapsed_secs = tracker.get_progress().elapsed.as_secs_f64();
        statistics.average_events_per_second = if elapsed_secs > 0.0 {
            statistics.events_transformed as f64 / elapsed_secs
        } else {
            0.0
        };

        if let Err(err) = Self::check_cancelled(tracker) {
            if recipe.supports_rollback {
                statistics.rolled_back = true;
                Self::try_rollback(recipe, tracker, backup_handle.as_ref()).await;
            }
            return Err(err);
        }

        let verification_result = if let Some(config) = &recipe.verification {
            tracker.set_status(MigrationStatus::Verifying);
            tracker.set_phase(MigrationPhase::DualRead);
            let result = Verifier::verify(
                config,
                &source_events,
                &transformed,
                recipe.transformer.as_deref(),
            )
            .await?;
            if !result.passed && config.fail_fast {
                if recipe.supports_rollback {
                    statistics.rolled_back = true;
                    Self::try_rollback(recipe, tracker, backup_handle.as_ref()).await;
                }
                return Err(Error::VerificationFailed {
                    summary: result.summary.clone(),
                });
            }
            Some(result)
        } else {
            None
        };

        if let Some(guard) = lock_guard {
            if let Err(err) = guard.check() {
                if recipe.supports_rollback {
                    statistics.rolled_back = true;
                    Self::try_rollback(recipe, tracker, backup_handle.as_ref()).await;
                }
                return Err(err);
            }
        }

        tracker.set_status(MigrationStatus::CuttingOver);
        tracker.set_phase(MigrationPhase::Cutover);
        let doc = cutover(
            recipe.document_store.as_ref(),
            recipe.source_doc.clone(),
            &recipe.source_stream_id,
            &recipe.target_stream_id,
        )
        .await
        .map_err(|e| Error::DocumentWriteFailed {
            object_id: recipe.source_doc.object_id.clone(),
            reason: e.to_string(),
        })?;

        if let Some(config) = &recipe.book_close {
            tracker.set_phase(MigrationPhase::BookClosed);
            book_close(
                recipe.document_store.as_ref(),
                &doc.object_name,
                &doc.object_id,
                &recipe.source_stream_id,
                config,
            )
            .await?;
        }

        statistics.completed_at = Some(Utc::now());
        Ok((plan, verification_result, statistics.clone()))
    }

    /// Replaces the copy/verify/cutover phases with the catch-up-then-close
    /// loop for a recipe built with `with_live_migration` (§4.7).
    async fn run_live(
        recipe: &MigrationRecipe,
        tracker: &ProgressTracker,
        statistics: &mut MigrationStatistics,
        plan: Option<MigrationPlan>,
        live_options: &crate::config::LiveMigrationOptions,
    ) -> Result<(Option<MigrationPlan>, Option<crate::model::VerificationResult>, MigrationStatistics)> {
        tracker.set_status(MigrationStatus::InProgress);
        tracker.set_phase(MigrationPhase::DualWrite);

        let doc = crate::live::LiveMigrationExecutor::run(
            recipe.data_store.as_ref(),
            recipe.document_store.as_ref(),
            recipe.source_doc.clone(),
            &recipe.source_stream_id,
            &recipe.target_stream_id,
            recipe.transformer.as_deref(),
            live_options,
        )
        .await?;

        tracker.set_status(MigrationStatus::CuttingOver);
        tracker.set_phase(MigrationPhase::Cutover);

        if let Some(config) = &recipe.book_close {
            tracker.set_phase(MigrationPhase::BookClosed);
            book_close(
                recipe.document_store.as_ref(),
                &doc.object_name,
                &doc.object_id,
                &recipe.source_stream_id,
                config,
            )
            .await?;
        }

        statistics.completed_at = Some(Utc::now());
        Ok((plan, None, statistics.clone()))
    }

    /// Observes cooperative cancellation requested via a [`MigrationRegistry`]
    /// (§5: "checked once per event" and at phase boundaries).
    fn check_cancelled(tracker: &ProgressTracker) -> Result<()> {
        if tracker.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn wait_while_paused(tracker: &ProgressTracker) {
        if !tracker.is_paused() {
            return;
        }
        let mut backoff = PAUSE_POLL_BASE;
        while tracker.is_paused() {
            info!("migration paused, polling for resume");
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(PAUSE_POLL_CAP);
        }
    }

    /// Compensation on failure (§4.6): `RollingBack` while attempting
    /// `provider.restore`, then `RolledBack` regardless of whether a backup
    /// handle existed to restore from — the core admits target writes may
    /// remain; cleanup beyond that is the provider's domain.
    async fn try_rollback(
        recipe: &MigrationRecipe,
        tracker: &ProgressTracker,
        backup_handle: Option<&crate::model::BackupHandle>,
    ) {
        tracker.set_status(MigrationStatus::RollingBack);

        if let (Some(provider), Some(handle)) = (&recipe.backup_provider, backup_handle) {
            if let Err(err) =
                BackupCoordinator::restore(provider.as_ref(), handle, recipe.source_doc.clone()).await
            {
                error!(
                    migration_id = %recipe.migration_id,
                    error = %err,
                    "rollback restore failed"
                );
            }
        }

        tracker.set_status(MigrationStatus::RolledBack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MigrationRecipeBuilder;
    use crate::config::VerificationConfiguration;
    use crate::ids::{ObjectId, StreamIdentifier};
    use crate::model::{Event, ObjectDocument, StreamInfo};
    use crate::testing::{InMemoryDataStore, InMemoryDocumentStore, RenameTransformer};
    use bytes::Bytes;
    use std::sync::Arc;

    fn event(version: u64, event_type: &str) -> Event {
        Event {
            event_version: version,
            event_type: event_type.to_string(),
            schema_version: 1,
            timestamp: Utc::now(),
            payload: Bytes::from_static(b"{}"),
            metadata: Default::default(),
        }
    }

    /// Enables `tracing` output for timing-sensitive tests (lock heartbeat,
    /// cancellation); harmless to call more than once per process.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn doc() -> ObjectDocument {
        ObjectDocument {
            object_id: ObjectId::new("obj-1"),
            object_name: "widgets".to_string(),
            active: StreamInfo {
                stream_identifier: StreamIdentifier::new("s1"),
                current_version: 2,
                connection_names: vec!["primary".to_string()],
                store_type: "segmented".to_string(),
                chunk_size: 4096,
                snapshots: Vec::new(),
            },
            terminated_streams: Vec::new(),
            schema_version: 1,
            hash: String::new(),
            prev_hash: String::new(),
        }
    }

    #[tokio::test]
    async fn three_event_migration_without_transformer_completes() {
        let data_store = Arc::new(InMemoryDataStore::new());
        let document_store = Arc::new(InMemoryDocumentStore::new());
        let source = doc();
        data_store
            .seed("s1", vec![event(0, "A"), event(1, "B"), event(2, "C")])
            .await;
        document_store.seed(source.clone()).await;

        let recipe = MigrationRecipeBuilder::new(source, data_store, document_store.clone())
            .copy_to_new_stream("s2")
            .with_verification(VerificationConfiguration::default())
            .build()
            .unwrap();

        let result = MigrationExecutor::run(recipe).await.unwrap();
        assert!(result.success);
        assert_eq!(result.statistics.total_events, 3);
        assert!(result.verification_result.unwrap().passed);

        let updated = document_store.get("widgets", &ObjectId::new("obj-1")).await.unwrap();
        assert_eq!(updated.active.stream_identifier, StreamIdentifier::new("s2"));
    }

    #[tokio::test]
    async fn recipe_with_live_migration_option_dispatches_to_catch_up_loop() {
        use crate::config::LiveMigrationOptions;

        let data_store = Arc::new(InMemoryDataStore::new());
        let document_store = Arc::new(InMemoryDocumentStore::new());
        let source = doc();
        data_store.seed("s1", vec![event(0, "A"), event(1, "B")]).await;
        document_store.seed(source.clone()).await;

        let recipe = MigrationRecipeBuilder::new(source, data_store.clone(), document_store.clone())
            .copy_to_new_stream("s2")
            .with_live_migration(LiveMigrationOptions {
                max_iterations: 5,
                min_sleep_between_iterations: std::time::Duration::from_millis(1),
                close_timeout: std::time::Duration::from_secs(1),
            })
            .build()
            .unwrap();

        let result = MigrationExecutor::run(recipe).await.unwrap();
        assert!(result.success, "{:?}", result.error_message);

        let updated = document_store.get("widgets", &ObjectId::new("obj-1")).await.unwrap();
        assert_eq!(updated.active.stream_identifier, StreamIdentifier::new("s2"));
        assert_eq!(data_store.events_of("s2").await.len(), 2);
    }

    #[tokio::test]
    async fn registry_cancel_aborts_an_in_flight_migration() {
        init_tracing();
        use crate::providers::Transformer;
        use crate::registry::MigrationRegistry;
        use async_trait::async_trait;

        struct SlowTransformer;
        #[async_trait]
        impl Transformer for SlowTransformer {
            async fn transform(&self, event: Event) -> Result<Event> {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(event)
            }
        }

        let data_store = Arc::new(InMemoryDataStore::new());
        let document_store = Arc::new(InMemoryDocumentStore::new());
        let source = doc();
        data_store
            .seed("s1", vec![event(0, "A"), event(1, "B"), event(2, "C"), event(3, "D")])
            .await;
        document_store.seed(source.clone()).await;

        let migration_id = crate::ids::MigrationId::new("cancel-me");
        let recipe = MigrationRecipeBuilder::new(source, data_store, document_store.clone())
            .copy_to_new_stream("s2")
            .with_transformation(Arc::new(SlowTransformer))
            .with_rollback_support()
            .build()
            .unwrap();
        let recipe = MigrationRecipe {
            migration_id: migration_id.clone(),
            ..recipe
        };

        let registry = Arc::new(MigrationRegistry::new());
        let run_registry = registry.clone();
        let handle = tokio::spawn(async move {
            MigrationExecutor::run_with_registry(recipe, &run_registry).await.unwrap()
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(registry.cancel(&migration_id));

        let result = handle.await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("Cancelled"));
        assert!(result.statistics.rolled_back);
        assert_eq!(result.status, MigrationStatus::RolledBack);
    }

    #[tokio::test]
    async fn transformation_failure_is_skipped_and_counted_without_fail_fast() {
        use crate::testing::FailingTransformer;

        let data_store = Arc::new(InMemoryDataStore::new());
        let document_store = Arc::new(InMemoryDocumentStore::new());
        let source = doc();
        data_store
            .seed("s1", vec![event(0, "A"), event(1, "B"), event(2, "C")])
            .await;
        document_store.seed(source.clone()).await;

        let recipe = MigrationRecipeBuilder::new(source, data_store.clone(), document_store)
            .copy_to_new_stream("s2")
            .with_transformation(Arc::new(FailingTransformer { fail_at_version: 1 }))
            .build()
            .unwrap();

        let result = MigrationExecutor::run(recipe).await.unwrap();
        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.statistics.transformation_failures, 1);
        assert_eq!(result.statistics.events_transformed, 2);
        assert_eq!(data_store.events_of("s2").await.len(), 2);
    }

    #[tokio::test]
    async fn lock_loss_detected_before_append_triggers_rollback() {
        init_tracing();
        use crate::providers::Transformer;
        use crate::testing::InMemoryLockProvider;
        use async_trait::async_trait;

        struct SlowTransformer;
        #[async_trait]
        impl Transformer for SlowTransformer {
            async fn transform(&self, event: Event) -> Result<Event> {
                tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                Ok(event)
            }
        }

        let data_store = Arc::new(InMemoryDataStore::new());
        let document_store = Arc::new(InMemoryDocumentStore::new());
        let lock_provider = Arc::new(InMemoryLockProvider::new());
        let source = doc();
        data_store
            .seed("s1", vec![event(0, "A"), event(1, "B"), event(2, "C")])
            .await;
        document_store.seed(source.clone()).await;

        let object_id = source.object_id.clone();
        let recipe = MigrationRecipeBuilder::new(source, data_store, document_store)
            .copy_to_new_stream("s2")
            .with_transformation(Arc::new(SlowTransformer))
            .with_distributed_lock(
                crate::config::LockOptions {
                    timeout: std::time::Duration::from_millis(500),
                    heartbeat_interval: std::time::Duration::from_millis(10),
                    lease_duration: std::time::Duration::from_secs(30),
                },
                lock_provider.clone(),
            )
            .with_rollback_support()
            .build()
            .unwrap();

        let key = crate::ids::LockKey::new(object_id.as_str());
        let lock_provider_for_task = lock_provider.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            lock_provider_for_task.force_expire(&key).await;
        });

        let result = MigrationExecutor::run(recipe).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("LockLost"));
        assert!(result.statistics.rolled_back);
        assert_eq!(result.status, MigrationStatus::RolledBack);
    }

    #[tokio::test]
    async fn live_migration_failure_triggers_rollback_when_supported() {
        use crate::config::LiveMigrationOptions;

        let data_store = Arc::new(InMemoryDataStore::new());
        let document_store = Arc::new(InMemoryDocumentStore::new());
        let source = doc();
        data_store
            .seed("s1", vec![event(0, "A"), event(1, "B")])
            .await;
        document_store.seed(source.clone()).await;

        let recipe = MigrationRecipeBuilder::new(source, data_store, document_store)
            .copy_to_new_stream("s2")
            .with_live_migration(LiveMigrationOptions {
                max_iterations: 0,
                min_sleep_between_iterations: std::time::Duration::from_millis(1),
                close_timeout: std::time::Duration::from_secs(1),
            })
            .with_rollback_support()
            .build()
            .unwrap();

        let result = MigrationExecutor::run(recipe).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("LiveMigrationDidNotConverge"));
        assert!(result.statistics.rolled_back);
        assert_eq!(result.status, MigrationStatus::RolledBack);
    }

    #[tokio::test]
    async fn transformer_rename_migration_verifies() {
        let data_store = Arc::new(InMemoryDataStore::new());
        let document_store = Arc::new(InMemoryDocumentStore::new());
        let source = doc();
        data_store.seed("s1", vec![event(0, "Created"), event(1, "Updated")]).await;
        document_store.seed(source.clone()).await;

        let transformer = Arc::new(RenameTransformer {
            from: "Created".to_string(),
            to: "ObjectCreated".to_string(),
        });

        let recipe = MigrationRecipeBuilder::new(source, data_store, document_store)
            .copy_to_new_stream("s2")
            .with_transformation(transformer)
            .with_verification(VerificationConfiguration::default())
            .build()
            .unwrap();

        let result = MigrationExecutor::run(recipe).await.unwrap();
        assert!(result.success, "{:?}", result.error_message);
    }
}
