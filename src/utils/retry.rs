//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff with jitter. Store writes that lose
//! a race for a row surface as `StorageError::Contention`; only those are
//! retried.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::config::FulfillmentConfig;
use crate::storage::StorageError;

/// Backoff for pledge commits, seat updates and delivery advancement.
pub fn fulfillment_backoff(config: &FulfillmentConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.retry_min_delay_ms))
        .with_max_delay(Duration::from_millis(config.retry_max_delay_ms))
        .with_max_times(config.max_attempts)
        .with_jitter()
}

/// Determines if a storage error is worth retrying.
///
/// Retryable:
/// - `Contention`: a concurrent writer held the lock or changed the row
///
/// Non-retryable:
/// - `OverCommit`, `CapacityExceeded`: the row was read consistently and the
///   request does not fit. Retrying reads the same answer.
pub fn is_retryable_storage(err: &StorageError) -> bool {
    err.is_contention()
}

/// Run a store write, retrying while it fails with `Contention`.
///
/// The last error is returned once the backoff is exhausted.
pub async fn retry_on_contention<T, F, Fut>(
    config: &FulfillmentConfig,
    operation: &'static str,
    write: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    write
        .retry(fulfillment_backoff(config))
        .when(is_retryable_storage)
        .notify(|err: &StorageError, dur: Duration| {
            warn!(operation, error = %err, delay = ?dur, "Write contention, retrying");
        })
        .await
}
