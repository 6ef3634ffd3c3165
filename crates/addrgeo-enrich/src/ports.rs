//! Seams between the pipeline and its collaborators.

use addrgeo_core::EnrichedRecord;
use addrgeo_geocode::{GeocodeClient, GeocodeError, GeocodeResult};

use crate::error::StoreError;

/// Resolves one address to coordinates.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    /// # Errors
    ///
    /// Returns [`GeocodeError`] for transport or body-parse failures. An
    /// address the provider cannot resolve is `Ok(GeocodeResult::Unresolved)`.
    async fn resolve(&self, address: &str) -> Result<GeocodeResult, GeocodeError>;
}

impl Geocoder for GeocodeClient {
    async fn resolve(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        GeocodeClient::resolve(self, address).await
    }
}

/// Transactional write handle for enriched records.
#[allow(async_fn_in_trait)]
pub trait RecordSink {
    /// Writes one record. A failure must leave earlier uncommitted writes intact.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write is rejected.
    async fn insert(&mut self, record: &EnrichedRecord) -> Result<(), StoreError>;

    /// Makes every write since the previous checkpoint durable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails.
    async fn checkpoint(&mut self) -> Result<(), StoreError>;
}
