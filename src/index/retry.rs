//! Timeout and exponential backoff for package index calls

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::IndexConfig;
use crate::index::error::IndexError;

/// Upper bound for a server-requested wait (Retry-After)
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Bound for each individual attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&IndexConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &IndexConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_backoff_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based): base * 2^(attempt - 1)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    fn delay_for(&self, attempt: u32, error: &IndexError) -> Duration {
        match error {
            IndexError::RateLimited {
                retry_after_secs: Some(secs),
            } => Duration::from_secs(*secs)
                .min(MAX_RETRY_AFTER)
                .max(self.backoff(attempt)),
            _ => self.backoff(attempt),
        }
    }
}

/// Run `operation` with a per-attempt timeout, retrying transient failures
///
/// Non-transient errors are returned immediately. When retries run out the
/// last error is returned.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    description: &str,
    mut operation: F,
) -> Result<T, IndexError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IndexError>>,
{
    let mut attempt = 0;

    loop {
        let result = match tokio::time::timeout(policy.timeout, operation()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(IndexError::Timeout {
                millis: u64::try_from(policy.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() || attempt >= policy.max_retries => return Err(e),
            Err(e) => e,
        };

        attempt += 1;
        let delay = policy.delay_for(attempt, &error);
        warn!(
            attempt = attempt,
            backoff_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "retrying {}",
            description
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(4, 800)]
    fn backoff_doubles_each_attempt(#[case] attempt: u32, #[case] expected_ms: u64) {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(attempt), Duration::from_millis(expected_ms));
    }

    #[tokio::test]
    async fn with_retry_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_policy(3), "list versions", || async {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            if call < 2 {
                Err(IndexError::Unavailable("503".to_string()))
            } else {
                Ok("2.31.0")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "2.31.0");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(2), "list versions", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(IndexError::Unavailable("502".to_string()))
        })
        .await;

        assert!(matches!(result, Err(IndexError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_permanent_failures() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_policy(3), "list versions", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(IndexError::NotFound("nope".to_string()))
        })
        .await;

        assert!(matches!(result, Err(IndexError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn with_retry_times_out_slow_attempts() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
        };
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&policy, "list versions", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(IndexError::Timeout { millis: 20 })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
