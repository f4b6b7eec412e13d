//! Fulfillment retry configuration.

use serde::Deserialize;

/// Backoff applied when a pledge or seat update loses a race for the row.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FulfillmentConfig {
    pub retry_min_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Retries after the first attempt.
    pub max_attempts: usize,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            retry_min_delay_ms: 10,
            retry_max_delay_ms: 500,
            max_attempts: 5,
        }
    }
}
