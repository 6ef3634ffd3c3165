//! Client for the Google Geocoding API.
//!
//! [`GeocodeClient::resolve`] turns one free-text address into a
//! [`GeocodeResult`]: either a coordinate pair or an explicit
//! [`Unresolved`] reason. Transport and body-parse failures are returned as
//! [`GeocodeError`] so callers can tell them apart from a clean miss.

pub mod backoff;
pub mod client;
pub mod error;
pub mod types;

pub use backoff::BackoffPolicy;
pub use client::GeocodeClient;
pub use error::GeocodeError;
pub use types::{GeocodeResult, GeocodeStatus, Unresolved};
