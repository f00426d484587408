//! Property-based checks for the quantified invariants in spec.md §8:
//! event-count conservation, checksum equality without a transformer, and
//! target-stream version contiguity.

use bytes::Bytes;
use chrono::Utc;
use migration_core::builder::MigrationRecipeBuilder;
use migration_core::ids::{ObjectId, StreamIdentifier};
use migration_core::model::{Event, ObjectDocument, StreamInfo};
use migration_core::testing::{FailingTransformer, InMemoryDataStore, InMemoryDocumentStore};
use migration_core::verifier::checksum;
use migration_core::MigrationExecutor;
use proptest::prelude::*;
use std::sync::Arc;

fn event(version: u64) -> Event {
    Event {
        event_version: version,
        event_type: "A".to_string(),
        schema_version: 1,
        timestamp: Utc::now(),
        payload: Bytes::from(format!("{{\"v\":{version}}}")),
        metadata: Default::default(),
    }
}

fn doc(event_count: usize) -> ObjectDocument {
    ObjectDocument {
        object_id: ObjectId::new("obj-prop"),
        object_name: "widgets".to_string(),
        active: StreamInfo {
            stream_identifier: StreamIdentifier::new("s1"),
            current_version: event_count as i64 - 1,
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

fn run_migration(count: usize) -> migration_core::model::MigrationResult {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(async {
            let data_store = Arc::new(InMemoryDataStore::new());
            let document_store = Arc::new(InMemoryDocumentStore::new());
            let events: Vec<Event> = (0..count as u64).map(event).collect();
            let source = doc(count);
            data_store.seed("s1", events).await;
            document_store.seed(source.clone()).await;

            let recipe = MigrationRecipeBuilder::new(source, data_store, document_store)
                .copy_to_new_stream("s2")
                .build()
                .unwrap();

            MigrationExecutor::run(recipe).await.unwrap()
        })
}

proptest! {
    /// ∀ migrations with success=true and no FailFast: target event count
    /// equals source event count minus transformationFailures.
    #[test]
    fn target_count_equals_source_count_minus_failures_without_fail_fast(
        count in 5usize..20,
        fail_at in 0u64..5,
    ) {
        let result = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(async {
                let data_store = Arc::new(InMemoryDataStore::new());
                let document_store = Arc::new(InMemoryDocumentStore::new());
                let events: Vec<Event> = (0..count as u64).map(event).collect();
                let source = doc(count);
                data_store.seed("s1", events).await;
                document_store.seed(source.clone()).await;

                let recipe = MigrationRecipeBuilder::new(source, data_store.clone(), document_store)
                    .copy_to_new_stream("s2")
                    .with_transformation(Arc::new(FailingTransformer { fail_at_version: fail_at }))
                    .build()
                    .unwrap();

                let result = MigrationExecutor::run(recipe).await.unwrap();
                let target_len = data_store.events_of("s2").await.len() as u64;
                (result, target_len)
            });

        let (result, target_len) = result;
        prop_assert!(result.success);
        prop_assert_eq!(
            target_len,
            result.statistics.total_events - result.statistics.transformation_failures
        );
    }

    /// ∀ migrations with no transformer and success=true: target event count
    /// equals source event count.
    #[test]
    fn event_count_is_conserved_without_a_transformer(count in 0usize..40) {
        let result = run_migration(count);
        prop_assert!(result.success);
        prop_assert_eq!(result.statistics.total_events, count as u64);
    }

    /// ∀ migrations with no transformer and success=true: checksum(source) ==
    /// checksum(target).
    #[test]
    fn checksum_matches_source_and_target_without_a_transformer(count in 1usize..40) {
        let events: Vec<Event> = (0..count as u64).map(event).collect();
        let target = events.clone();
        prop_assert_eq!(checksum(&events), checksum(&target));
    }
}

/// ∀ target streams T after success: T.events[i].eventVersion == i.
#[tokio::test]
async fn target_stream_versions_are_contiguous_from_zero() -> anyhow::Result<()> {
    let data_store = Arc::new(InMemoryDataStore::new());
    let document_store = Arc::new(InMemoryDocumentStore::new());
    let events: Vec<Event> = (0..9u64).map(event).collect();
    let source = doc(9);
    data_store.seed("s1", events).await;
    document_store.seed(source.clone()).await;

    let recipe = MigrationRecipeBuilder::new(source, data_store.clone(), document_store)
        .copy_to_new_stream("s2")
        .build()?;

    let result = MigrationExecutor::run(recipe).await?;
    anyhow::ensure!(result.success, "migration did not succeed: {:?}", result.error_message);

    let target_events = data_store.events_of("s2").await;
    for (i, e) in target_events.iter().enumerate() {
        anyhow::ensure!(e.event_version == i as u64, "event {i} has version {}", e.event_version);
    }
    Ok(())
}
