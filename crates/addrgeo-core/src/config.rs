use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_GEOCODE_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        match lookup(var) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingEnvVar(var.to_string())),
        }
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|value| !value.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let geocode_api_key = optional("GOOGLE_MAPS_API_KEY");

    let env = parse_environment(&or_default("ADDRGEO_ENV", "development"))?;
    let log_level = or_default("ADDRGEO_LOG_LEVEL", "info");

    let geocode_base_url = or_default("ADDRGEO_GEOCODE_BASE_URL", DEFAULT_GEOCODE_BASE_URL);
    let geocode_timeout_secs = parse_u64("ADDRGEO_GEOCODE_TIMEOUT_SECS", "10")?;
    let geocode_max_retries = parse_u32("ADDRGEO_GEOCODE_MAX_RETRIES", "3")?;
    let geocode_initial_backoff_ms = parse_u64("ADDRGEO_GEOCODE_INITIAL_BACKOFF_MS", "1000")?;
    let geocode_max_backoff_ms = parse_u64("ADDRGEO_GEOCODE_MAX_BACKOFF_MS", "5000")?;

    let db_max_connections = parse_u32("ADDRGEO_DB_MAX_CONNECTIONS", "4")?;
    let db_min_connections = parse_u32("ADDRGEO_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ADDRGEO_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let batch_size = or_default("ADDRGEO_BATCH_SIZE", "100")
        .parse::<usize>()
        .map_err(|e| invalid("ADDRGEO_BATCH_SIZE", e.to_string()))?;
    if batch_size == 0 {
        return Err(invalid("ADDRGEO_BATCH_SIZE", "must be at least 1".to_string()));
    }
    let request_delay_ms = parse_u64("ADDRGEO_REQUEST_DELAY_MS", "150")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        geocode_api_key,
        geocode_base_url,
        geocode_timeout_secs,
        geocode_max_retries,
        geocode_initial_backoff_ms,
        geocode_max_backoff_ms,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        batch_size,
        request_delay_ms,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ADDRGEO_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
