use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Fully resolved process configuration.
///
/// Built once at startup by [`crate::load_app_config`] and passed by reference
/// into the pool, the geocoding client and the pipeline.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    /// Only the `enrich` command needs it; see
    /// [`AppConfig::require_geocode_api_key`].
    pub geocode_api_key: Option<String>,
    pub geocode_base_url: String,
    pub geocode_timeout_secs: u64,
    pub geocode_max_retries: u32,
    pub geocode_initial_backoff_ms: u64,
    pub geocode_max_backoff_ms: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Successful inserts between checkpoint commits. Always at least 1.
    pub batch_size: usize,
    pub request_delay_ms: u64,
}

impl AppConfig {
    /// Returns the geocoding API key, or an error naming the missing variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `GOOGLE_MAPS_API_KEY` was
    /// unset or blank at load time.
    pub fn require_geocode_api_key(&self) -> Result<&str, ConfigError> {
        self.geocode_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_MAPS_API_KEY".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field(
                "geocode_api_key",
                &self.geocode_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("geocode_base_url", &self.geocode_base_url)
            .field("geocode_timeout_secs", &self.geocode_timeout_secs)
            .field("geocode_max_retries", &self.geocode_max_retries)
            .field(
                "geocode_initial_backoff_ms",
                &self.geocode_initial_backoff_ms,
            )
            .field("geocode_max_backoff_ms", &self.geocode_max_backoff_ms)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("batch_size", &self.batch_size)
            .field("request_delay_ms", &self.request_delay_ms)
            .finish()
    }
}
