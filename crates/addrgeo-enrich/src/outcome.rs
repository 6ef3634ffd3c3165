use addrgeo_geocode::{GeocodeError, Unresolved};

use crate::error::StoreError;

/// What happened to a single source record.
///
/// Every record read lands in exactly one of these; the pipeline dispatches
/// on the variant instead of catching errors.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Geocoded and written.
    Inserted,
    /// Address was blank; the geocoder was never called.
    Skipped,
    /// The provider answered but did not resolve the address.
    Unresolved(Unresolved),
    /// The geocoding request itself failed (network, timeout, bad body).
    TransportFailure(GeocodeError),
    /// Geocoded, but the insert was rejected.
    StorageFailure(StoreError),
}

impl RecordOutcome {
    /// `true` for the outcomes counted as API failures.
    #[must_use]
    pub fn is_api_failure(&self) -> bool {
        matches!(self, Self::Unresolved(_) | Self::TransportFailure(_))
    }
}
