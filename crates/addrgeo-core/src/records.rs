//! Record types shared by the source reader, the geocoder and the writer.

use serde::{Deserialize, Serialize};

/// One row of raw, un-enriched address data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: i64,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl SourceRecord {
    /// Returns the address when it has at least one non-whitespace character.
    ///
    /// The source query already filters `NULL` addresses, but blank strings
    /// pass that filter and must never reach the geocoder.
    #[must_use]
    pub fn usable_address(&self) -> Option<&str> {
        self.address.as_deref().filter(|a| !a.trim().is_empty())
    }
}

/// A resolved latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A source record augmented with resolved coordinates, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub id: i64,
    pub name: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl EnrichedRecord {
    #[must_use]
    pub fn new(source: &SourceRecord, address: &str, coordinates: Coordinates) -> Self {
        Self {
            id: source.id,
            name: source.name.clone(),
            address: address.to_owned(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        }
    }
}
