//! Dry-run feasibility planning (§4.5).

use crate::error::Result;
use crate::ids::PlanId;
use crate::model::{
    MigrationPlan, ResourceEstimate, Risk, StreamAnalysis, TransformationFailureSample,
    TransformationSimulation,
};
use crate::providers::{DataStore, DocumentStore, Transformer};
use crate::status::Severity;
use std::collections::HashMap;
use std::time::Duration;

/// Events/sec assumed for the conservative duration estimate.
const ASSUMED_THROUGHPUT_EVENTS_PER_SEC: u64 = 1000;
/// Bytes assumed per event for the size estimate.
const ASSUMED_BYTES_PER_EVENT: u64 = 1024;
/// Above this event count, a Performance risk is raised.
const LARGE_STREAM_THRESHOLD: u64 = 10_000;
/// Above this failure rate, the Transformation-failure risk becomes High.
const HIGH_FAILURE_RATE: f64 = 0.10;

pub struct DryRunPlanner;

impl DryRunPlanner {
    /// Reads the source stream and builds a feasibility plan without
    /// mutating any state.
    pub async fn plan(
        data_store: &dyn DataStore,
        document_store: &dyn DocumentStore,
        source_doc: &crate::model::ObjectDocument,
        transformer: Option<&dyn Transformer>,
        sample_size: usize,
        has_backup_configured: bool,
        has_document_store: bool,
    ) -> Result<MigrationPlan> {
        let events = data_store.read(source_doc, None, None, None).await?;

        let mut type_distribution: HashMap<String, u64> = HashMap::new();
        for event in &events {
            *type_distribution.entry(event.event_type.clone()).or_insert(0) += 1;
        }

        let source_analysis = StreamAnalysis {
            event_count: events.len() as u64,
            estimated_size_bytes: events.len() as u64 * ASSUMED_BYTES_PER_EVENT,
            type_distribution,
            current_version: source_doc.active.current_version,
        };

        let transformation_simulation = if let Some(transformer) = transformer {
            let n = sample_size.min(events.len());
            let mut successes = 0u64;
            let mut failures = Vec::new();
            for event in events.iter().take(n) {
                match transformer.transform(event.clone()).await {
                    Ok(_) => successes += 1,
                    Err(err) => failures.push(TransformationFailureSample {
                        event_version: event.event_version,
                        event_type: event.event_type.clone(),
                        reason: err.to_string(),
                    }),
                }
            }
            Some(TransformationSimulation {
                sampled: n as u64,
                successes,
                failures,
            })
        } else {
            None
        };

        let resource_estimate = ResourceEstimate {
            estimated_duration: Duration::from_secs_f64(
                source_analysis.event_count as f64 / ASSUMED_THROUGHPUT_EVENTS_PER_SEC as f64,
            ),
            estimated_bandwidth_bytes: source_analysis.estimated_size_bytes * 2,
        };

        let _ = document_store; // presence already implied by `has_document_store`

        let mut prerequisites = Vec::new();
        prerequisites.push("DataStore configured".to_string());
        if has_document_store {
            prerequisites.push("DocumentStore configured".to_string());
        }

        let mut risks = Vec::new();
        if source_analysis.event_count > LARGE_STREAM_THRESHOLD {
            risks.push(Risk {
                category: "Performance".to_string(),
                severity: Severity::Medium,
                description: format!(
                    "source stream has {} events, above the {} threshold",
                    source_analysis.event_count, LARGE_STREAM_THRESHOLD
                ),
                mitigation: "consider live migration to avoid a long downtime window".to_string(),
            });
        }

        if let Some(sim) = &transformation_simulation {
            if !sim.failures.is_empty() {
                let failure_rate = sim.failures.len() as f64 / sim.sampled.max(1) as f64;
                let severity = if failure_rate > HIGH_FAILURE_RATE {
                    Severity::High
                } else {
                    Severity::Medium
                };
                risks.push(Risk {
                    category: "Transformation".to_string(),
                    severity,
                    description: format!(
                        "{} of {} sampled events failed to transform",
                        sim.failures.len(),
                        sim.sampled
                    ),
                    mitigation: "review the failing event types before running for real".to_string(),
                });
            }
        }

        if !has_backup_configured {
            risks.push(Risk {
                category: "DataSafety".to_string(),
                severity: Severity::High,
                description: "no backup configuration supplied".to_string(),
                mitigation: "configure a BackupProvider before running a real migration"
                    .to_string(),
            });
        }

        let has_high_risk = risks.iter().any(|r| r.severity == Severity::High);
        let is_feasible =
            has_document_store && (!has_high_risk || has_backup_configured);

        let mut recommended_phases = vec!["1. Copy and transform events".to_string()];
        if transformer.is_some() {
            recommended_phases.push("2. Verify transformation equivalence".to_string());
        } else {
            recommended_phases.push("2. Verify checksum equivalence".to_string());
        }
        recommended_phases.push("3. Cut over to the new stream".to_string());

        Ok(MigrationPlan {
            plan_id: PlanId::new(uuid::Uuid::new_v4().to_string()),
            source_analysis,
            transformation_simulation,
            resource_estimate,
            prerequisites,
            risks,
            recommended_phases,
            is_feasible,
        })
    }
}
