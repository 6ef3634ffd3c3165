//! Exponential backoff schedule for `OVER_QUERY_LIMIT` responses.

use std::time::Duration;

use addrgeo_core::AppConfig;

const DEFAULT_INITIAL_MS: u64 = 1_000;
const DEFAULT_CEILING_MS: u64 = 5_000;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// How long to wait between rate-limited attempts, and how many to make.
///
/// With the defaults the schedule is:
///
/// | Retry | Sleep before it |
/// |-------|-----------------|
/// | 1     | 1 s             |
/// | 2     | 2 s             |
/// | 3     | 4 s             |
///
/// so one address costs at most four requests. Later retries (when
/// `max_retries` is raised) are capped at the 5 s ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub ceiling: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(DEFAULT_INITIAL_MS),
            ceiling: Duration::from_millis(DEFAULT_CEILING_MS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BackoffPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.geocode_initial_backoff_ms),
            ceiling: Duration::from_millis(config.geocode_max_backoff_ms),
            max_retries: config.geocode_max_retries,
        }
    }

    /// No sleeping at all; retries still happen. Used by tests.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            initial: Duration::ZERO,
            ceiling: Duration::ZERO,
            max_retries,
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial
            .saturating_mul(1u32 << exponent)
            .min(self.ceiling)
    }
}
