use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use addrgeo_core::Coordinates;
use addrgeo_geocode::{GeocodeError, Unresolved};
use futures::stream;

use super::*;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Answer {
    At(f64, f64),
    Miss(Unresolved),
    Transport,
}

/// Answers by address; unknown addresses resolve to (1.0, 2.0).
#[derive(Default)]
struct ScriptedGeocoder {
    answers: HashMap<String, Answer>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedGeocoder {
    fn answer(mut self, address: &str, answer: Answer) -> Self {
        self.answers.insert(address.to_owned(), answer);
        self
    }
}

impl Geocoder for ScriptedGeocoder {
    async fn resolve(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        self.calls.borrow_mut().push(address.to_owned());
        match self.answers.get(address).cloned().unwrap_or(Answer::At(1.0, 2.0)) {
            Answer::At(latitude, longitude) => Ok(GeocodeResult::Resolved(Coordinates {
                latitude,
                longitude,
            })),
            Answer::Miss(reason) => Ok(GeocodeResult::Unresolved(reason)),
            Answer::Transport => Err(GeocodeError::Deserialize {
                context: format!("geocode(address={address})"),
                source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
            }),
        }
    }
}

/// Keeps pending and committed writes apart so tests can see what a
/// checkpoint made durable.
#[derive(Default)]
struct FakeSink {
    pending: Vec<EnrichedRecord>,
    committed: Vec<EnrichedRecord>,
    /// Committed row count after each checkpoint.
    checkpoints: Vec<usize>,
    reject_ids: HashSet<i64>,
    fail_checkpoint: bool,
}

impl RecordSink for FakeSink {
    async fn insert(&mut self, record: &EnrichedRecord) -> Result<(), StoreError> {
        if self.reject_ids.contains(&record.id) {
            return Err(StoreError::Sqlx(sqlx::Error::Protocol(format!(
                "duplicate key for codparc {}",
                record.id
            ))));
        }
        self.pending.push(record.clone());
        Ok(())
    }

    async fn checkpoint(&mut self) -> Result<(), StoreError> {
        if self.fail_checkpoint {
            return Err(StoreError::Sqlx(sqlx::Error::PoolClosed));
        }
        self.committed.append(&mut self.pending);
        self.checkpoints.push(self.committed.len());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingObserver {
    processed: RefCell<Vec<(i64, &'static str)>>,
    checkpoints: RefCell<Vec<u64>>,
    finished: RefCell<Option<RunSummary>>,
}

impl PipelineObserver for RecordingObserver {
    fn record_processed(&self, record: &SourceRecord, outcome: &RecordOutcome) {
        let tag = match outcome {
            RecordOutcome::Inserted => "inserted",
            RecordOutcome::Skipped => "skipped",
            RecordOutcome::Unresolved(_) => "unresolved",
            RecordOutcome::TransportFailure(_) => "transport",
            RecordOutcome::StorageFailure(_) => "storage",
        };
        self.processed.borrow_mut().push((record.id, tag));
    }

    fn checkpoint_committed(&self, inserted: u64) {
        self.checkpoints.borrow_mut().push(inserted);
    }

    fn run_finished(&self, summary: &RunSummary) {
        *self.finished.borrow_mut() = Some(*summary);
    }
}

fn record(id: i64, address: Option<&str>) -> SourceRecord {
    SourceRecord {
        id,
        name: Some(format!("Parceiro {id}")),
        address: address.map(str::to_owned),
    }
}

fn config(batch_size: usize) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        request_delay: Duration::ZERO,
    }
}

fn pipeline(
    geocoder: ScriptedGeocoder,
    batch_size: usize,
) -> EnrichmentPipeline<ScriptedGeocoder, RecordingObserver> {
    EnrichmentPipeline::with_observer(geocoder, RecordingObserver::default(), config(batch_size))
}

fn source(
    records: Vec<SourceRecord>,
) -> impl Stream<Item = Result<SourceRecord, StoreError>> {
    stream::iter(records.into_iter().map(Ok))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_addresses_are_skipped_without_geocoding() {
    let pipeline = pipeline(ScriptedGeocoder::default(), 100);
    let mut sink = FakeSink::default();

    let summary = pipeline
        .run(
            source(vec![
                record(1, None),
                record(2, Some("")),
                record(3, Some("   \t")),
                record(4, Some("Rua Augusta, 500")),
            ]),
            &mut sink,
        )
        .await
        .unwrap();

    assert_eq!(summary.read(), 4);
    assert_eq!(summary.skipped(), 3);
    assert_eq!(summary.inserted(), 1);
    assert_eq!(
        *pipeline.geocoder.calls.borrow(),
        vec!["Rua Augusta, 500".to_owned()]
    );
}

#[tokio::test]
async fn every_record_lands_in_exactly_one_bucket() {
    let geocoder = ScriptedGeocoder::default()
        .answer("zero", Answer::Miss(Unresolved::Status("ZERO_RESULTS".into())))
        .answer("limit", Answer::Miss(Unresolved::RateLimited { attempts: 4 }))
        .answer("broken", Answer::Transport);
    let pipeline = pipeline(geocoder, 100);
    let mut sink = FakeSink {
        reject_ids: HashSet::from([5]),
        ..FakeSink::default()
    };

    let summary = pipeline
        .run(
            source(vec![
                record(1, Some("ok")),
                record(2, Some("zero")),
                record(3, Some("limit")),
                record(4, Some("broken")),
                record(5, Some("ok too")),
                record(6, Some(" ")),
            ]),
            &mut sink,
        )
        .await
        .unwrap();

    assert_eq!(summary.read(), 6);
    assert_eq!(summary.inserted(), 1);
    assert_eq!(summary.api_failures(), 3);
    assert_eq!(summary.storage_failures(), 1);
    assert_eq!(summary.skipped(), 1);
    assert!(summary.is_balanced());
    assert_eq!(
        *pipeline.observer().processed.borrow(),
        vec![
            (1, "inserted"),
            (2, "unresolved"),
            (3, "unresolved"),
            (4, "transport"),
            (5, "storage"),
            (6, "skipped"),
        ]
    );
}

#[tokio::test]
async fn commits_every_batch_and_once_more_at_the_end() {
    let pipeline = pipeline(ScriptedGeocoder::default(), 100);
    let mut sink = FakeSink::default();
    let records = (1..=250).map(|id| record(id, Some("somewhere"))).collect();

    let summary = pipeline.run(source(records), &mut sink).await.unwrap();

    assert_eq!(summary.inserted(), 250);
    assert_eq!(sink.checkpoints, vec![100, 200, 250]);
    assert_eq!(*pipeline.observer().checkpoints.borrow(), vec![100, 200, 250]);
    assert!(sink.pending.is_empty());
}

#[tokio::test]
async fn batch_boundary_counts_only_successful_inserts() {
    let geocoder = ScriptedGeocoder::default().answer("miss", Answer::Miss(Unresolved::NoResults));
    let pipeline = pipeline(geocoder, 2);
    let mut sink = FakeSink::default();

    pipeline
        .run(
            source(vec![
                record(1, Some("a")),
                record(2, Some("miss")),
                record(3, None),
                record(4, Some("b")),
                record(5, Some("c")),
            ]),
            &mut sink,
        )
        .await
        .unwrap();

    // Commit after the 2nd insert (record 4), then the final flush of record 5.
    assert_eq!(sink.checkpoints, vec![2, 3]);
}

#[tokio::test]
async fn storage_failure_does_not_stop_the_run_or_undo_commits() {
    let pipeline = pipeline(ScriptedGeocoder::default(), 2);
    let mut sink = FakeSink {
        reject_ids: HashSet::from([3]),
        ..FakeSink::default()
    };

    let summary = pipeline
        .run(
            source((1..=5).map(|id| record(id, Some("x"))).collect()),
            &mut sink,
        )
        .await
        .unwrap();

    assert_eq!(summary.inserted(), 4);
    assert_eq!(summary.storage_failures(), 1);
    let committed: Vec<i64> = sink.committed.iter().map(|r| r.id).collect();
    assert_eq!(committed, vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn records_are_written_in_source_order() {
    let pipeline = pipeline(ScriptedGeocoder::default(), 100);
    let mut sink = FakeSink::default();
    let ids = [42, 7, 19, 3];

    pipeline
        .run(
            source(ids.iter().map(|&id| record(id, Some("x"))).collect()),
            &mut sink,
        )
        .await
        .unwrap();

    let written: Vec<i64> = sink.committed.iter().map(|r| r.id).collect();
    assert_eq!(written, ids);
}

#[tokio::test]
async fn enriched_record_carries_source_fields_and_coordinates() {
    let geocoder = ScriptedGeocoder::default().answer("Av. Paulista", Answer::At(-23.5, -46.6));
    let pipeline = pipeline(geocoder, 100);
    let mut sink = FakeSink::default();

    pipeline
        .run(source(vec![record(9, Some("Av. Paulista"))]), &mut sink)
        .await
        .unwrap();

    assert_eq!(
        sink.committed,
        vec![EnrichedRecord {
            id: 9,
            name: Some("Parceiro 9".to_owned()),
            address: "Av. Paulista".to_owned(),
            latitude: -23.5,
            longitude: -46.6,
        }]
    );
}

#[tokio::test]
async fn source_error_aborts_and_keeps_only_checkpointed_rows() {
    let pipeline = pipeline(ScriptedGeocoder::default(), 2);
    let mut sink = FakeSink::default();
    let items = vec![
        Ok(record(1, Some("a"))),
        Ok(record(2, Some("b"))),
        Ok(record(3, Some("c"))),
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut)),
        Ok(record(4, Some("d"))),
    ];

    let result = pipeline.run(stream::iter(items), &mut sink).await;

    assert!(
        matches!(result, Err(PipelineError::Source(_))),
        "expected Source error, got: {result:?}"
    );
    assert_eq!(sink.checkpoints, vec![2]);
    assert_eq!(sink.pending.len(), 1, "record 3 is left uncommitted");
    assert!(pipeline.observer().finished.borrow().is_none());
}

#[tokio::test]
async fn failed_checkpoint_is_fatal() {
    let pipeline = pipeline(ScriptedGeocoder::default(), 100);
    let mut sink = FakeSink {
        fail_checkpoint: true,
        ..FakeSink::default()
    };

    let result = pipeline
        .run(source(vec![record(1, Some("a"))]), &mut sink)
        .await;

    assert!(
        matches!(result, Err(PipelineError::Checkpoint { inserted: 1, .. })),
        "expected Checkpoint error, got: {result:?}"
    );
}

#[tokio::test]
async fn empty_source_still_flushes_and_reports() {
    let pipeline = pipeline(ScriptedGeocoder::default(), 100);
    let mut sink = FakeSink::default();

    let summary = pipeline.run(source(Vec::new()), &mut sink).await.unwrap();

    assert_eq!(summary.read(), 0);
    assert_eq!(sink.checkpoints, vec![0]);
    assert_eq!(*pipeline.observer().finished.borrow(), Some(summary));
}

#[tokio::test]
async fn process_record_reports_transport_failure_as_api_failure() {
    let geocoder = ScriptedGeocoder::default().answer("down", Answer::Transport);
    let pipeline = pipeline(geocoder, 100);
    let mut sink = FakeSink::default();

    let outcome = pipeline
        .process_record(&record(1, Some("down")), &mut sink)
        .await;

    assert!(matches!(outcome, RecordOutcome::TransportFailure(_)));
    assert!(outcome.is_api_failure());
    assert!(sink.pending.is_empty());
}

#[test]
fn zero_batch_size_is_clamped_to_one() {
    let pipeline = pipeline(ScriptedGeocoder::default(), 0);
    assert_eq!(pipeline.config.batch_size, 1);
}

#[test]
fn default_config_matches_documented_values() {
    let config = PipelineConfig::default();
    assert_eq!(config.batch_size, 100);
    assert_eq!(config.request_delay, Duration::from_millis(150));
}

// ---------------------------------------------------------------------------
// Inter-record delay (paused clock)
// ---------------------------------------------------------------------------

fn delayed_pipeline(
    geocoder: ScriptedGeocoder,
    delay: Duration,
) -> EnrichmentPipeline<ScriptedGeocoder, RecordingObserver> {
    EnrichmentPipeline::with_observer(
        geocoder,
        RecordingObserver::default(),
        PipelineConfig {
            batch_size: 100,
            request_delay: delay,
        },
    )
}

/// Paused-clock time is exact up to the timer's 1 ms tick.
fn assert_elapsed(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(5),
        "expected about {expected:?} of pauses, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn every_outcome_pauses_and_unresolved_pauses_twice() {
    let geocoder = ScriptedGeocoder::default()
        .answer("down", Answer::Transport)
        .answer("nowhere", Answer::Miss(Unresolved::NoResults));
    let pipeline = delayed_pipeline(geocoder, Duration::from_millis(150));
    let mut sink = FakeSink {
        reject_ids: HashSet::from([4]),
        ..FakeSink::default()
    };

    let started = tokio::time::Instant::now();
    let summary = pipeline
        .run(
            source(vec![
                record(1, Some("  ")),
                record(2, Some("Rua Augusta")),
                record(3, Some("down")),
                record(4, Some("Rua da Consolacao")),
                record(5, Some("nowhere")),
            ]),
            &mut sink,
        )
        .await
        .unwrap();

    assert!(summary.is_balanced());
    // skip, insert, transport and storage failures pause once; unresolved twice.
    assert_elapsed(started.elapsed(), Duration::from_millis(6 * 150));
}

#[tokio::test(start_paused = true)]
async fn single_unresolved_record_pauses_twice() {
    let geocoder = ScriptedGeocoder::default()
        .answer("nowhere", Answer::Miss(Unresolved::Status("ZERO_RESULTS".into())));
    let pipeline = delayed_pipeline(geocoder, Duration::from_millis(150));
    let mut sink = FakeSink::default();

    let started = tokio::time::Instant::now();
    pipeline
        .run(source(vec![record(1, Some("nowhere"))]), &mut sink)
        .await
        .unwrap();

    assert_elapsed(started.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn skipped_record_still_pauses() {
    let pipeline = delayed_pipeline(ScriptedGeocoder::default(), Duration::from_millis(150));
    let mut sink = FakeSink::default();

    let started = tokio::time::Instant::now();
    pipeline
        .run(source(vec![record(1, None)]), &mut sink)
        .await
        .unwrap();

    assert_elapsed(started.elapsed(), Duration::from_millis(150));
    assert!(pipeline.geocoder.calls.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn zero_delay_never_sleeps() {
    let pipeline = delayed_pipeline(ScriptedGeocoder::default(), Duration::ZERO);
    let mut sink = FakeSink::default();

    let started = tokio::time::Instant::now();
    pipeline
        .run(
            source((1..=10).map(|id| record(id, Some("x"))).collect()),
            &mut sink,
        )
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
}
