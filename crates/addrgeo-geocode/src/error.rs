use thiserror::Error;

/// Errors returned by the geocoding client.
///
/// These are transport-level conditions. A provider answer that simply does
/// not resolve the address is an [`crate::Unresolved`] value, not an error.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network, TLS, timeout or non-2xx status from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid geocoding endpoint '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
