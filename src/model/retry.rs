/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 20/10/25
******************************************************************************/
use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS, MAX_RETRY_DELAY_MS};
use crate::utils::config::get_env_or_none;
use pretty_simple_display::{DebugPretty, DisplaySimple};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for HTTP request retry behavior
///
/// Only safe reads are retried. Writes are sent exactly once regardless of this
/// configuration.
#[derive(DebugPretty, DisplaySimple, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts for a safe read (None = default 3)
    pub max_retry_count: Option<u32>,
    /// Base delay in milliseconds of the exponential backoff (None = default 1000)
    pub retry_delay_ms: Option<u64>,
}

impl RetryConfig {
    /// Creates a new retry configuration with the defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `MAX_RETRY_COUNT` and `RETRY_DELAY_MS` from the environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_retry_count: get_env_or_none("MAX_RETRY_COUNT"),
            retry_delay_ms: get_env_or_none("RETRY_DELAY_MS"),
        }
    }

    /// Single attempt, no retry
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retry_count: Some(1),
            retry_delay_ms: Some(0),
        }
    }

    /// Creates a new retry configuration with a maximum number of attempts
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retry_count: Some(max_retries),
            retry_delay_ms: None,
        }
    }

    /// Creates a new retry configuration with both max attempts and base delay
    #[must_use]
    pub fn with_max_retries_and_delay(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retry_count: Some(max_retries),
            retry_delay_ms: Some(delay_ms),
        }
    }

    /// Gets the total number of attempts (at least 1)
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retry_count.unwrap_or(DEFAULT_MAX_RETRIES).max(1)
    }

    /// Gets the base delay in milliseconds
    #[must_use]
    pub fn delay_ms(&self) -> u64 {
        self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS)
    }

    /// Backoff before the attempt following `attempt` (zero based)
    ///
    /// `base * 2^attempt`, capped at ten seconds, plus up to 10% jitter.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .delay_ms()
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(MAX_RETRY_DELAY_MS);
        let jitter_range = exp / 10;
        let jitter = if jitter_range > 0 {
            rand::rng().random_range(0..=jitter_range)
        } else {
            0
        };
        Duration::from_millis(exp + jitter)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_count: None,
            retry_delay_ms: None,
        }
    }
}
