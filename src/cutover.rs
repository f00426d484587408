//! Atomic cutover and book-close (§4.6).

use crate::config::BookCloseConfiguration;
use crate::error::Result;
use crate::ids::StreamIdentifier;
use crate::model::{ObjectDocument, StreamInfo, TerminatedStream};
use crate::providers::DocumentStore;
use chrono::Utc;

/// Writes the new active-stream pointer and appends a terminated-stream
/// record for the prior source, in one document write.
pub async fn cutover(
    document_store: &dyn DocumentStore,
    mut doc: ObjectDocument,
    source_stream_id: &StreamIdentifier,
    target_stream_id: &StreamIdentifier,
) -> Result<ObjectDocument> {
    let source_version = doc.active.current_version;

    let new_active =
        StreamInfo::empty_target_like(&doc.active, target_stream_id.clone());
    let new_active = StreamInfo {
        current_version: source_version,
        ..new_active
    };

    let terminated = TerminatedStream {
        stream_identifier: source_stream_id.clone(),
        reason: format!("Migrated to {target_stream_id}"),
        continuation_stream_id: target_stream_id.clone(),
        termination_date: Utc::now(),
        stream_version: source_version,
        deleted: false,
        metadata: Default::default(),
    };

    doc.active = new_active;
    doc.terminated_streams.push(terminated);

    document_store.set(&doc).await?;
    Ok(doc)
}

/// Re-reads the document, locates the terminated-stream entry for
/// `source_stream_id`, and overlays book-close annotations onto it.
pub async fn book_close(
    document_store: &dyn DocumentStore,
    object_name: &str,
    object_id: &crate::ids::ObjectId,
    source_stream_id: &StreamIdentifier,
    config: &BookCloseConfiguration,
) -> Result<ObjectDocument> {
    let mut doc = document_store.get(object_name, object_id).await?;

    if let Some(entry) = doc
        .terminated_streams
        .iter_mut()
        .find(|t| &t.stream_identifier == source_stream_id)
    {
        if let Some(reason) = &config.reason {
            entry.reason = reason.clone();
        }
        entry.deleted = config.deleted;
        if let Some(location) = &config.archive_location {
            entry
                .metadata
                .insert("archiveLocation".to_string(), location.clone());
        }
        for (k, v) in &config.metadata {
            entry.metadata.insert(k.clone(), v.clone());
        }
    }

    document_store.set(&doc).await?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryDocumentStore;

    fn doc(object_id: &str, active_stream: &str) -> ObjectDocument {
        ObjectDocument {
            object_id: crate::ids::ObjectId::new(object_id),
            object_name: "widgets".to_string(),
            active: StreamInfo {
                stream_identifier: StreamIdentifier::new(active_stream),
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
    async fn cutover_switches_active_stream_and_records_termination() {
        let store = InMemoryDocumentStore::new();
        let source = doc("obj-1", "s1");
        store.seed(source.clone()).await;

        let updated = cutover(
            &store,
            source.clone(),
            &StreamIdentifier::new("s1"),
            &StreamIdentifier::new("s2"),
        )
        .await
        .unwrap();

        assert_eq!(updated.active.stream_identifier, StreamIdentifier::new("s2"));
        assert_eq!(updated.active.current_version, 2);
        assert_eq!(updated.terminated_streams.len(), 1);
        assert_eq!(
            updated.terminated_streams[0].continuation_stream_id,
            StreamIdentifier::new("s2")
        );
    }

    #[tokio::test]
    async fn book_close_annotates_existing_terminated_entry() {
        let store = InMemoryDocumentStore::new();
        let source = doc("obj-1", "s1");
        store.seed(source.clone()).await;

        let cut = cutover(
            &store,
            source,
            &StreamIdentifier::new("s1"),
            &StreamIdentifier::new("s2"),
        )
        .await
        .unwrap();
        store.seed(cut).await;

        let config = BookCloseConfiguration {
            reason: Some("archived".to_string()),
            create_snapshot: false,
            archive_location: Some("cold://bucket/obj-1".to_string()),
            deleted: true,
            metadata: Default::default(),
        };

        let closed = book_close(
            &store,
            "widgets",
            &crate::ids::ObjectId::new("obj-1"),
            &StreamIdentifier::new("s1"),
            &config,
        )
        .await
        .unwrap();

        let entry = &closed.terminated_streams[0];
        assert_eq!(entry.reason, "archived");
        assert!(entry.deleted);
        assert_eq!(
            entry.metadata.get("archiveLocation"),
            Some(&"cold://bucket/obj-1".to_string())
        );
    }
}
