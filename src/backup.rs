//! Backup coordination before any target-stream mutation (§4.4).

use crate::error::Result;
use crate::model::{BackupHandle, ObjectDocument};
use crate::providers::{BackupContext, BackupProvider, RestoreContext};

/// Thin orchestration over a [`BackupProvider`]: the provider owns every
/// policy decision (snapshots, compression, retention); this coordinator
/// only shapes the request and hands back the resulting handle.
pub struct BackupCoordinator;

impl BackupCoordinator {
    pub async fn backup(
        provider: &dyn BackupProvider,
        document: ObjectDocument,
        events: Vec<crate::model::Event>,
    ) -> Result<BackupHandle> {
        provider
            .backup(BackupContext { document, events })
            .await
    }

    pub async fn restore(
        provider: &dyn BackupProvider,
        handle: &BackupHandle,
        target: ObjectDocument,
    ) -> Result<()> {
        provider
            .restore(
                handle,
                RestoreContext {
                    target,
                    overwrite: true,
                },
            )
            .await
    }
}
