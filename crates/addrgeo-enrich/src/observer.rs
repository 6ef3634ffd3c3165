//! Pipeline event hooks.
//!
//! The pipeline reports through [`PipelineObserver`] instead of writing logs
//! directly, so tests can assert on what happened. [`TracingObserver`] is the
//! production implementation.

use addrgeo_core::SourceRecord;

use crate::outcome::RecordOutcome;
use crate::summary::RunSummary;

pub trait PipelineObserver {
    /// Called once per source record, after its outcome is known.
    fn record_processed(&self, _record: &SourceRecord, _outcome: &RecordOutcome) {}

    /// Called after each successful checkpoint commit with the running insert total.
    fn checkpoint_committed(&self, _inserted: u64) {}

    fn run_finished(&self, _summary: &RunSummary) {}
}

/// Forwards pipeline events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn record_processed(&self, record: &SourceRecord, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Inserted => {
                tracing::debug!(codparc = record.id, "record geocoded and inserted");
            }
            RecordOutcome::Skipped => {
                tracing::debug!(codparc = record.id, "skipping record with blank address");
            }
            RecordOutcome::Unresolved(reason) => {
                tracing::warn!(
                    codparc = record.id,
                    address = record.address.as_deref().unwrap_or_default(),
                    reason = %reason,
                    "address not resolved"
                );
            }
            RecordOutcome::TransportFailure(err) => {
                tracing::error!(codparc = record.id, error = %err, "geocoding request failed");
            }
            RecordOutcome::StorageFailure(err) => {
                tracing::error!(codparc = record.id, error = %err, "insert failed");
            }
        }
    }

    fn checkpoint_committed(&self, inserted: u64) {
        tracing::info!(inserted, "checkpoint committed");
    }

    fn run_finished(&self, summary: &RunSummary) {
        tracing::info!(
            total_read = summary.read(),
            inserted = summary.inserted(),
            skipped = summary.skipped(),
            api_failures = summary.api_failures(),
            storage_failures = summary.storage_failures(),
            "enrichment run finished"
        );
    }
}
