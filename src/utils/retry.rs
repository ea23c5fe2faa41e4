//! Exponential-backoff retry for transport-level errors.
//!
//! The pipeline core never retries on its own; this utility is for callers
//! that own the retry policy around embedding and vector-store transport
//! errors.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Classifies whether an error is worth retrying.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for anyhow::Error {
    fn is_retryable(&self) -> bool {
        let msg = self.to_string().to_lowercase();
        msg.contains("timeout")
            || msg.contains("connection refused")
            || msg.contains("connection reset")
            || msg.contains("temporarily unavailable")
            || msg.contains("service unavailable")
            || msg.contains("too many requests")
    }
}

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// Run `operation` with exponential backoff until it succeeds, exhausts
/// `max_attempts`, or fails with a non-retryable error.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= config.max_attempts || !error.is_retryable() {
                    return Err(error);
                }

                tracing::debug!(attempt, ?error, "retrying after transient failure");

                // Jitter to avoid thundering herd
                let jitter = Duration::from_millis(nanos_jitter(delay.as_millis() as u64 / 4));
                sleep(delay + jitter).await;

                delay = Duration::from_secs_f64(delay.as_secs_f64() * config.multiplier)
                    .min(config.max_delay);
            }
        }
    }
}

/// Cheap non-cryptographic jitter sourced from the clock.
fn nanos_jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    seed % max
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError(&'static str);

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.0 == "transient"
        }
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::new(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TestError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new(3).with_initial_delay(Duration::from_millis(5));
        let result = with_retry(&config, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TestError("transient"))
            } else {
                Ok("ok")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::new(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(TestError("permanent"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new(3).with_initial_delay(Duration::from_millis(5));
        let result = with_retry(&config, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(TestError("transient"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
