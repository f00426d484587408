//! Fluent builder surface (§6, §9 "Patterns requiring re-architecture").
//!
//! The source system exposes this as configuration-capturing closures
//! (`configure: builder -> void`). Here it is an explicit builder over
//! plain configuration records: every `with_*` call populates a field and
//! returns `self`; invalid combinations are rejected in [`MigrationRecipeBuilder::build`]
//! as [`Error::PreconditionViolated`] rather than relying on exception
//! semantics specific to one source language.

use crate::config::{
    BackupConfiguration, BookCloseConfiguration, LiveMigrationOptions, LockOptions,
    ProgressConfiguration, VerificationConfiguration,
};
use crate::error::{Error, Result};
use crate::ids::{MigrationId, StreamIdentifier};
use crate::model::{MigrationPlan, MigrationProgress, MigrationResult};
use crate::providers::{
    BackupProvider, CustomValidation, DataStore, DistributedLockProvider, DocumentStore, Transformer,
};
use crate::model::ObjectDocument;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback invoked on each throttled progress report.
pub type ProgressCallback = Arc<dyn Fn(&MigrationProgress) + Send + Sync>;
/// Callback invoked once when a migration completes successfully.
pub type CompletedCallback = Arc<dyn Fn(&MigrationResult) + Send + Sync>;
/// Callback invoked once when a migration fails.
pub type FailedCallback = Arc<dyn Fn(&Error) + Send + Sync>;
/// A user-supplied custom metric collector; returning `None` omits it from the snapshot.
pub type MetricCollector = Arc<dyn Fn() -> Option<f64> + Send + Sync>;

/// Fully-resolved configuration for a single migration, consumed by
/// [`crate::executor::MigrationExecutor`].
pub struct MigrationRecipe {
    pub migration_id: MigrationId,
    pub source_doc: ObjectDocument,
    pub source_stream_id: StreamIdentifier,
    pub target_stream_id: StreamIdentifier,

    pub transformer: Option<Arc<dyn Transformer>>,

    pub lock_options: Option<LockOptions>,
    pub backup: Option<BackupConfiguration>,
    pub book_close: Option<BookCloseConfiguration>,
    pub verification: Option<VerificationConfiguration>,
    pub progress: ProgressConfiguration,

    pub on_progress: Option<ProgressCallback>,
    pub on_completed: Option<CompletedCallback>,
    pub on_failed: Option<FailedCallback>,
    pub custom_metrics: HashMap<String, MetricCollector>,

    pub is_dry_run: bool,
    pub supports_pause: bool,
    pub supports_rollback: bool,
    pub live: Option<LiveMigrationOptions>,

    pub data_store: Arc<dyn DataStore>,
    pub document_store: Arc<dyn DocumentStore>,
    pub lock_provider: Option<Arc<dyn DistributedLockProvider>>,
    pub backup_provider: Option<Arc<dyn BackupProvider>>,

    pub metadata: HashMap<String, String>,
    /// A previously-computed dry-run plan, reused to skip re-analysis (§6 `FromDryRunPlan`).
    pub from_plan: Option<MigrationPlan>,
}

/// Builds a [`MigrationRecipe`], one object at a time.
pub struct MigrationRecipeBuilder {
    migration_id: MigrationId,
    source_doc: ObjectDocument,
    target_stream_id: StreamIdentifier,
    transformer: Option<Arc<dyn Transformer>>,
    lock_options: Option<LockOptions>,
    backup: Option<BackupConfiguration>,
    book_close: Option<BookCloseConfiguration>,
    verification: Option<VerificationConfiguration>,
    progress: ProgressConfiguration,
    on_progress: Option<ProgressCallback>,
    on_completed: Option<CompletedCallback>,
    on_failed: Option<FailedCallback>,
    custom_metrics: HashMap<String, MetricCollector>,
    is_dry_run: bool,
    supports_pause: bool,
    supports_rollback: bool,
    live: Option<LiveMigrationOptions>,
    data_store: Arc<dyn DataStore>,
    document_store: Arc<dyn DocumentStore>,
    lock_provider: Option<Arc<dyn DistributedLockProvider>>,
    backup_provider: Option<Arc<dyn BackupProvider>>,
    metadata: HashMap<String, String>,
    from_plan: Option<MigrationPlan>,
}

impl MigrationRecipeBuilder {
    /// Starts building a recipe for `source_doc`, reading/writing through
    /// `data_store`/`document_store`.
    pub fn new(
        source_doc: ObjectDocument,
        data_store: Arc<dyn DataStore>,
        document_store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            migration_id: MigrationId::new(uuid::Uuid::new_v4().to_string()),
            target_stream_id: StreamIdentifier::new(format!(
                "{}-migrated-{}",
                source_doc.active.stream_identifier, uuid::Uuid::new_v4()
            )),
            source_doc,
            transformer: None,
            lock_options: None,
            backup: None,
            book_close: None,
            verification: None,
            progress: ProgressConfiguration::default(),
            on_progress: None,
            on_completed: None,
            on_failed: None,
            custom_metrics: HashMap::new(),
            is_dry_run: false,
            supports_pause: false,
            supports_rollback: false,
            live: None,
            data_store,
            document_store,
            lock_provider: None,
            backup_provider: None,
            metadata: HashMap::new(),
            from_plan: None,
        }
    }

    pub fn copy_to_new_stream(mut self, id: impl Into<StreamIdentifier>) -> Self {
        self.target_stream_id = id.into();
        self
    }

    pub fn with_transformation(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn with_pipeline(mut self, pipeline: Arc<dyn Transformer>) -> Self {
        self.transformer = Some(pipeline);
        self
    }

    pub fn with_distributed_lock(
        mut self,
        options: LockOptions,
        provider: Arc<dyn DistributedLockProvider>,
    ) -> Self {
        self.lock_options = Some(options);
        self.lock_provider = Some(provider);
        self
    }

    pub fn with_backup(
        mut self,
        configuration: BackupConfiguration,
        provider: Arc<dyn BackupProvider>,
    ) -> Self {
        self.backup = Some(configuration);
        self.backup_provider = Some(provider);
        self
    }

    pub fn with_book_closing(mut self, configuration: BookCloseConfiguration) -> Self {
        self.book_close = Some(configuration);
        self
    }

    pub fn with_verification(mut self, configuration: VerificationConfiguration) -> Self {
        self.verification = Some(configuration);
        self
    }

    /// Appends a custom validator to the verification configuration,
    /// creating it with defaults first if `with_verification` wasn't called.
    pub fn with_custom_validation(mut self, validation: Arc<dyn CustomValidation>) -> Self {
        self.verification
            .get_or_insert_with(VerificationConfiguration::default)
            .custom_validations
            .push(validation);
        self
    }

    pub fn with_progress(
        mut self,
        configuration: ProgressConfiguration,
        on_progress: Option<ProgressCallback>,
        on_completed: Option<CompletedCallback>,
        on_failed: Option<FailedCallback>,
    ) -> Self {
        self.progress = configuration;
        self.on_progress = on_progress;
        self.on_completed = on_completed;
        self.on_failed = on_failed;
        self
    }

    pub fn with_custom_metric(mut self, name: impl Into<String>, collector: MetricCollector) -> Self {
        self.custom_metrics.insert(name.into(), collector);
        self
    }

    pub fn with_pause_support(mut self) -> Self {
        self.supports_pause = true;
        self
    }

    pub fn with_rollback_support(mut self) -> Self {
        self.supports_rollback = true;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.is_dry_run = true;
        self
    }

    pub fn from_dry_run_plan(mut self, plan: MigrationPlan) -> Self {
        self.from_plan = Some(plan);
        self
    }

    pub fn with_live_migration(mut self, options: LiveMigrationOptions) -> Self {
        self.live = Some(options);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Validates the accumulated configuration and produces a [`MigrationRecipe`].
    pub fn build(self) -> Result<MigrationRecipe> {
        if self.target_stream_id == self.source_doc.active.stream_identifier {
            return Err(Error::PreconditionViolated(
                "target stream identifier must differ from the source stream identifier".into(),
            ));
        }

        if self.live.is_some() && self.is_dry_run {
            return Err(Error::PreconditionViolated(
                "live migration cannot be combined with a dry run".into(),
            ));
        }

        let source_stream_id = self.source_doc.active.stream_identifier.clone();

        Ok(MigrationRecipe {
            migration_id: self.migration_id,
            source_doc: self.source_doc,
            source_stream_id,
            target_stream_id: self.target_stream_id,
            transformer: self.transformer,
            lock_options: self.lock_options,
            backup: self.backup,
            book_close: self.book_close,
            verification: self.verification,
            progress: self.progress,
            on_progress: self.on_progress,
            on_completed: self.on_completed,
            on_failed: self.on_failed,
            custom_metrics: self.custom_metrics,
            is_dry_run: self.is_dry_run,
            supports_pause: self.supports_pause,
            supports_rollback: self.supports_rollback,
            live: self.live,
            data_store: self.data_store,
            document_store: self.document_store,
            lock_provider: self.lock_provider,
            backup_provider: self.backup_provider,
            metadata: self.metadata,
            from_plan: self.from_plan,
        })
    }
}
