//! Geocoding API response types and the resolved/unresolved outcome.

use std::fmt;

use addrgeo_core::Coordinates;
use serde::Deserialize;

/// Top-level body of a geocode response.
///
/// Only the fields the client consumes are modelled; everything else the
/// provider sends is ignored.
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeCandidate>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeCandidate {
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// The provider's `status` field, reduced to the cases the client acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeStatus {
    Ok,
    /// Quota exhausted; the only retryable status.
    OverQueryLimit,
    Other(String),
}

impl GeocodeStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "OK" => Self::Ok,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Outcome of resolving one address.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeResult {
    Resolved(Coordinates),
    Unresolved(Unresolved),
}

impl GeocodeResult {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Resolved(c) => Some(*c),
            Self::Unresolved(_) => None,
        }
    }
}

/// Why an address did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// Any non-OK status other than `OVER_QUERY_LIMIT`, e.g. `ZERO_RESULTS`.
    Status(String),
    /// `OK` with an empty `results` array.
    NoResults,
    /// The first result lacked `lat` or `lng`.
    MissingCoordinates,
    /// `OVER_QUERY_LIMIT` on every attempt.
    RateLimited { attempts: u32 },
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "geocode status {status}"),
            Self::NoResults => write!(f, "no results"),
            Self::MissingCoordinates => write!(f, "missing lat/lng"),
            Self::RateLimited { attempts } => {
                write!(f, "OVER_QUERY_LIMIT after {attempts} attempts")
            }
        }
    }
}
