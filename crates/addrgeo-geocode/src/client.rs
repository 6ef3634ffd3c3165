//! HTTP client for the Google Geocoding API.
//!
//! Wraps `reqwest` with the provider's status handling: `OK` yields the first
//! candidate's coordinates, `OVER_QUERY_LIMIT` is retried on a
//! [`BackoffPolicy`] schedule, and every other status is a terminal miss.

use std::time::Duration;

use addrgeo_core::{AppConfig, Coordinates};
use reqwest::{Client, Url};

use crate::backoff::BackoffPolicy;
use crate::error::GeocodeError;
use crate::types::{GeocodeResponse, GeocodeResult, GeocodeStatus, Unresolved};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Client for the geocoding endpoint.
///
/// Use [`GeocodeClient::new`] for production or
/// [`GeocodeClient::with_base_url`] to point at a mock server in tests.
pub struct GeocodeClient {
    client: Client,
    api_key: String,
    base_url: Url,
    backoff: BackoffPolicy,
}

impl GeocodeClient {
    /// Creates a client pointed at the production geocoding endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        backoff: BackoffPolicy,
    ) -> Result<Self, GeocodeError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL, backoff)
    }

    /// Creates a client with a custom endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`GeocodeError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
        backoff: BackoffPolicy,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs))
            .user_agent("addrgeo/0.1 (address-enrichment)")
            .build()?;

        let base_url = Url::parse(base_url).map_err(|e| GeocodeError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            backoff,
        })
    }

    /// Builds a client from the process configuration and an API key already
    /// checked with [`AppConfig::require_geocode_api_key`].
    ///
    /// # Errors
    ///
    /// See [`GeocodeClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig, api_key: &str) -> Result<Self, GeocodeError> {
        Self::with_base_url(
            api_key,
            config.geocode_timeout_secs,
            &config.geocode_base_url,
            BackoffPolicy::from_app_config(config),
        )
    }

    /// Resolves `address` to coordinates.
    ///
    /// Each attempt is one GET request. `OVER_QUERY_LIMIT` sleeps and retries
    /// up to `max_retries` times; after that the address is
    /// [`Unresolved::RateLimited`]. Any other non-OK status, an empty result
    /// list, or a first result without both coordinates is returned as
    /// unresolved immediately.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure, timeout or non-2xx status.
    /// - [`GeocodeError::Deserialize`] if the body is not the expected JSON.
    pub async fn resolve(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        let url = self.build_url(address);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let payload = self.request_json(&url, address).await?;

            match GeocodeStatus::parse(&payload.status) {
                GeocodeStatus::Ok => return Ok(Self::first_location(address, payload)),
                GeocodeStatus::OverQueryLimit => {
                    if attempt > self.backoff.max_retries {
                        tracing::warn!(
                            address,
                            attempts = attempt,
                            "OVER_QUERY_LIMIT retries exhausted"
                        );
                        return Ok(GeocodeResult::Unresolved(Unresolved::RateLimited {
                            attempts: attempt,
                        }));
                    }
                    let delay = self.backoff.delay_for(attempt);
                    tracing::warn!(
                        address,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "OVER_QUERY_LIMIT, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                GeocodeStatus::Other(status) => {
                    tracing::warn!(
                        address,
                        attempt,
                        status = %status,
                        error_message = payload.error_message.as_deref().unwrap_or(""),
                        "geocode returned non-OK status"
                    );
                    return Ok(GeocodeResult::Unresolved(Unresolved::Status(status)));
                }
            }
        }
    }

    /// Extracts the first candidate's coordinates from an `OK` response.
    fn first_location(address: &str, payload: GeocodeResponse) -> GeocodeResult {
        let Some(first) = payload.results.into_iter().next() else {
            tracing::warn!(address, "geocode returned no results");
            return GeocodeResult::Unresolved(Unresolved::NoResults);
        };

        let location = first.geometry.and_then(|g| g.location);
        match location.and_then(|l| l.lat.zip(l.lng)) {
            Some((latitude, longitude)) => GeocodeResult::Resolved(Coordinates {
                latitude,
                longitude,
            }),
            None => {
                tracing::warn!(address, "geocode result is missing lat/lng");
                GeocodeResult::Unresolved(Unresolved::MissingCoordinates)
            }
        }
    }

    fn build_url(&self, address: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", &self.api_key);
        url
    }

    /// Sends a GET request, asserts a 2xx status, and parses the body.
    ///
    /// The request URL carries the API key, so transport errors are stripped
    /// of it and the parse context names the address instead.
    async fn request_json(
        &self,
        url: &Url,
        address: &str,
    ) -> Result<GeocodeResponse, GeocodeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(redact_url)?;
        let response = response.error_for_status().map_err(redact_url)?;
        let body = response.text().await.map_err(redact_url)?;
        serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
            context: format!("geocode(address={address})"),
            source: e,
        })
    }
}

fn redact_url(err: reqwest::Error) -> GeocodeError {
    GeocodeError::Http(err.without_url())
}
