//! The address enrichment pass: read source records, geocode each one, and
//! write the resolved ones to the destination table with periodic
//! checkpoint commits.
//!
//! [`EnrichmentPipeline`] is storage- and provider-agnostic; it talks to a
//! [`Geocoder`] and a [`RecordSink`]. [`run_with_pool`] wires it to Postgres.

pub mod error;
pub mod observer;
pub mod outcome;
pub mod pipeline;
pub mod ports;
pub mod store;
pub mod summary;

pub use error::{PipelineError, StoreError};
pub use observer::{PipelineObserver, TracingObserver};
pub use outcome::RecordOutcome;
pub use pipeline::{EnrichmentPipeline, PipelineConfig};
pub use ports::{Geocoder, RecordSink};
pub use store::{run_with_pool, DiscardSink, PgRecordSink};
pub use summary::{RunCounters, RunSummary};
