//! Enrichment pipeline orchestration.

use std::time::Duration;

use addrgeo_core::{AppConfig, EnrichedRecord, SourceRecord};
use addrgeo_geocode::GeocodeResult;
use futures::{Stream, StreamExt};

use crate::error::{PipelineError, StoreError};
use crate::observer::{PipelineObserver, TracingObserver};
use crate::outcome::RecordOutcome;
use crate::ports::{Geocoder, RecordSink};
use crate::summary::{RunCounters, RunSummary};

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_REQUEST_DELAY_MS: u64 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Successful inserts between checkpoint commits.
    pub batch_size: usize,
    /// Pause after every record, whatever its outcome. Unresolved records
    /// pause twice.
    pub request_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }
}

/// Drives the read → geocode → write loop for one pass.
pub struct EnrichmentPipeline<G, O = TracingObserver> {
    geocoder: G,
    observer: O,
    config: PipelineConfig,
}

impl<G: Geocoder> EnrichmentPipeline<G, TracingObserver> {
    #[must_use]
    pub fn new(geocoder: G, config: PipelineConfig) -> Self {
        Self::with_observer(geocoder, TracingObserver, config)
    }
}

impl<G: Geocoder, O: PipelineObserver> EnrichmentPipeline<G, O> {
    #[must_use]
    pub fn with_observer(geocoder: G, observer: O, config: PipelineConfig) -> Self {
        Self {
            geocoder,
            observer,
            config: PipelineConfig {
                batch_size: config.batch_size.max(1),
                ..config
            },
        }
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Runs one pass over `source`, writing resolved records to `sink`.
    ///
    /// Records are handled strictly in stream order:
    ///
    /// 1. Blank addresses are skipped without calling the geocoder.
    /// 2. Everything else is geocoded; resolved records are inserted.
    /// 3. Every `batch_size` successful inserts the sink is checkpointed.
    /// 4. The configured delay is slept after every record. An unresolved
    ///    record sleeps it once more before that, so a run of misses backs
    ///    off harder.
    ///
    /// After the source is exhausted the sink is checkpointed once more to
    /// flush the remainder.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Source`] if the source stream yields an error.
    /// - [`PipelineError::Checkpoint`] if a commit fails.
    ///
    /// Per-record geocoding and insert failures are counted, not returned.
    pub async fn run<S, K>(&self, source: S, sink: &mut K) -> Result<RunSummary, PipelineError>
    where
        S: Stream<Item = Result<SourceRecord, StoreError>>,
        K: RecordSink,
    {
        let mut source = std::pin::pin!(source);
        let mut counters = RunCounters::default();
        let mut since_checkpoint = 0usize;

        while let Some(item) = source.next().await {
            let record = item.map_err(PipelineError::Source)?;
            counters.record_read();

            let outcome = self.process_record(&record, sink).await;
            counters.tally(&outcome);
            self.observer.record_processed(&record, &outcome);

            if matches!(outcome, RecordOutcome::Inserted) {
                since_checkpoint += 1;
                if since_checkpoint == self.config.batch_size {
                    self.checkpoint(sink, &counters).await?;
                    since_checkpoint = 0;
                }
            }

            if matches!(outcome, RecordOutcome::Unresolved(_)) {
                self.pause().await;
            }
            self.pause().await;
        }

        self.checkpoint(sink, &counters).await?;

        let summary = counters.summary();
        self.observer.run_finished(&summary);
        Ok(summary)
    }

    /// Handles a single record and reports what happened to it.
    pub async fn process_record<K: RecordSink>(
        &self,
        record: &SourceRecord,
        sink: &mut K,
    ) -> RecordOutcome {
        let Some(address) = record.usable_address() else {
            return RecordOutcome::Skipped;
        };

        let coordinates = match self.geocoder.resolve(address).await {
            Ok(GeocodeResult::Resolved(coordinates)) => coordinates,
            Ok(GeocodeResult::Unresolved(reason)) => return RecordOutcome::Unresolved(reason),
            Err(err) => return RecordOutcome::TransportFailure(err),
        };

        let enriched = EnrichedRecord::new(record, address, coordinates);
        match sink.insert(&enriched).await {
            Ok(()) => RecordOutcome::Inserted,
            Err(err) => RecordOutcome::StorageFailure(err),
        }
    }

    async fn checkpoint<K: RecordSink>(
        &self,
        sink: &mut K,
        counters: &RunCounters,
    ) -> Result<(), PipelineError> {
        sink.checkpoint()
            .await
            .map_err(|source| PipelineError::Checkpoint {
                inserted: counters.inserted(),
                source,
            })?;
        self.observer.checkpoint_committed(counters.inserted());
        Ok(())
    }

    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
