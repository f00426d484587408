//! Live migration: catch-up copy against a source that keeps accepting
//! writes, closed with optimistic concurrency once caught up (§4.7).

use crate::config::LiveMigrationOptions;
use crate::cutover::cutover;
use crate::error::{Error, Result};
use crate::ids::{EventVersion, StreamIdentifier};
use crate::model::ObjectDocument;
use crate::providers::{DataStore, DocumentStore, Transformer};
use tokio::time::sleep;
use tracing::{debug, info};

/// Runs the catch-up-then-close loop for one object.
pub struct LiveMigrationExecutor;

impl LiveMigrationExecutor {
    /// Copies `doc`'s active stream to `target_stream_id`, polling for new
    /// source writes until a version-checked close succeeds or the
    /// iteration budget is exhausted.
    pub async fn run(
        data_store: &dyn DataStore,
        document_store: &dyn DocumentStore,
        doc: ObjectDocument,
        source_stream_id: &StreamIdentifier,
        target_stream_id: &StreamIdentifier,
        transformer: Option<&dyn Transformer>,
        options: &LiveMigrationOptions,
    ) -> Result<ObjectDocument> {
        let mut last_copied: Option<EventVersion> = None;

        for iteration in 0..options.max_iterations {
            let start_version = last_copied.map(|v| v + 1);
            let source_events = data_store
                .read(&doc, None, start_version, None)
                .await
                .map_err(|e| Error::ReadFailed {
                    object_id: doc.object_id.clone(),
                    reason: e.to_string(),
                })?;

            if !source_events.is_empty() {
                let mut batch = Vec::with_capacity(source_events.len());
                for event in source_events {
                    let event = match transformer {
                        Some(transformer) => transformer.transform(event).await?,
                        None => event,
                    };
                    last_copied = Some(event.event_version);
                    batch.push(event);
                }
                data_store
                    .append(&doc, Some(target_stream_id.as_str()), batch)
                    .await
                    .map_err(|e| Error::AppendFailed {
                        object_id: doc.object_id.clone(),
                        reason: e.to_string(),
                    })?;
                debug!(
                    object_id = %doc.object_id,
                    iteration,
                    last_copied = ?last_copied,
                    "live migration caught up a batch"
                );
                // More may have arrived while we were copying; loop again
                // before attempting the close.
                continue;
            }

            let expected_version = last_copied.map_or(-1, |v| v as i64);
            let closed = data_store
                .append_if_version(&doc, source_stream_id.as_str(), expected_version, Vec::new())
                .await
                .map_err(|e| Error::AppendFailed {
                    object_id: doc.object_id.clone(),
                    reason: e.to_string(),
                })?;

            if closed {
                info!(
                    object_id = %doc.object_id,
                    at_version = expected_version,
                    "live migration converged, cutting over"
                );
                let object_id = doc.object_id.clone();
                return cutover(document_store, doc, source_stream_id, target_stream_id)
                    .await
                    .map_err(|e| Error::DocumentWriteFailed {
                        object_id,
                        reason: e.to_string(),
                    });
            }

            sleep(options.min_sleep_between_iterations).await;
        }

        Err(Error::LiveMigrationDidNotConverge(doc.object_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ObjectId as Oid;
    use crate::model::StreamInfo;
    use crate::testing::{InMemoryDataStore, InMemoryDocumentStore};
    use bytes::Bytes;
    use chrono::Utc;

    fn event(version: u64) -> crate::model::Event {
        crate::model::Event {
            event_version: version,
            event_type: "A".to_string(),
            schema_version: 1,
            timestamp: Utc::now(),
            payload: Bytes::from_static(b"{}"),
            metadata: Default::default(),
        }
    }

    fn doc() -> ObjectDocument {
        ObjectDocument {
            object_id: Oid::new("obj-1"),
            object_name: "widgets".to_string(),
            active: StreamInfo {
                stream_identifier: StreamIdentifier::new("s1"),
                current_version: 1,
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
    async fn converges_and_cuts_over_once_source_is_quiet() {
        let data_store = InMemoryDataStore::new();
        let document_store = InMemoryDocumentStore::new();
        data_store.seed("s1", vec![event(0), event(1)]).await;
        document_store.seed(doc()).await;

        let options = LiveMigrationOptions {
            max_iterations: 5,
            min_sleep_between_iterations: std::time::Duration::from_millis(1),
            close_timeout: std::time::Duration::from_secs(1),
        };

        let result = LiveMigrationExecutor::run(
            &data_store,
            &document_store,
            doc(),
            &StreamIdentifier::new("s1"),
            &StreamIdentifier::new("s2"),
            None,
            &options,
        )
        .await
        .unwrap();

        assert_eq!(result.active.stream_identifier, StreamIdentifier::new("s2"));
        assert_eq!(data_store.events_of("s2").await.len(), 2);
    }

    #[tokio::test]
    async fn exhausting_iterations_without_quiet_source_does_not_converge() {
        let data_store = InMemoryDataStore::new();
        let document_store = InMemoryDocumentStore::new();
        document_store.seed(doc()).await;

        let options = LiveMigrationOptions {
            max_iterations: 0,
            min_sleep_between_iterations: std::time::Duration::from_millis(1),
            close_timeout: std::time::Duration::from_secs(1),
        };

        let result = LiveMigrationExecutor::run(
            &data_store,
            &document_store,
            doc(),
            &StreamIdentifier::new("s1"),
            &StreamIdentifier::new("s2"),
            None,
            &options,
        )
        .await;

        assert!(matches!(result, Err(Error::LiveMigrationDidNotConverge(_))));
    }
}
