//! Exponential backoff with jitter for transient Firestore failures.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info_span, warn, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_retry;

/// Retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Read `FIRESTORE_MAX_RETRIES`, `FIRESTORE_RETRY_BASE_MS` and
    /// `FIRESTORE_RETRY_MAX_MS`, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_parse("FIRESTORE_MAX_RETRIES").unwrap_or(defaults.max_retries),
            base_delay_ms: env_parse("FIRESTORE_RETRY_BASE_MS").unwrap_or(defaults.base_delay_ms),
            max_delay_ms: env_parse("FIRESTORE_RETRY_MAX_MS").unwrap_or(defaults.max_delay_ms),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent.
///
/// Network errors, 429 and 5xx responses are retried. A rate-limit delay
/// supplied by the server replaces the computed backoff.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> FirestoreResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = FirestoreResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        let span = info_span!("firestore_retry", operation = %operation, attempt = attempt + 1);

        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Firestore operation failed, retrying: {}",
                    e
                );
                record_retry(operation);
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| FirestoreError::request_failed("retry budget exhausted")))
}

fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after);
    }

    let capped = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_delay_ms);

    Duration::from_millis(jitter(capped).max(config.base_delay_ms))
}

/// Uniform-ish value in `0..=upper`, seeded from the clock.
fn jitter(upper: u64) -> u64 {
    if upper == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    ((upper as f64) * ((nanos % 1000) as f64 / 1000.0)) as u64
}
