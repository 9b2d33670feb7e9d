use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::{Error, Result};

/// Retry policy with bounded exponential backoff.
///
/// Delays grow as `base_delay * 2^attempt`, capped at `max_delay`. Only
/// transient errors (see [`Error::is_retryable`]) are retried; everything
/// else surfaces to the caller immediately.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound applied to every computed delay.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay to sleep after the given zero-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = 2_u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, a non-retryable error occurs, or the
/// attempt cap is reached.
///
/// Each backoff is logged with the attempt count and sleep duration.
///
/// # Errors
///
/// Returns the operation's own error if it is not retryable, or
/// [`Error::Exhausted`] once `policy.max_attempts` attempts have failed.
pub async fn retry<T, F, Fut>(operation: &str, policy: BackoffPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 0..policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) => {
                let remaining = policy.max_attempts - attempt - 1;
                if remaining == 0 {
                    warn!("{operation}: attempt {} failed: {error}", attempt + 1);
                    break;
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    "{operation}: attempt {} failed ({error}), retrying after {:.2}s",
                    attempt + 1,
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }
        }
    }

    Err(Error::Exhausted {
        operation: operation.to_owned(),
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_delay_growth_is_capped() {
        let policy = BackoffPolicy {
            max_attempts: 8,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(5), Duration::from_secs(32));
        assert_eq!(policy.delay_for(7), Duration::from_secs(60));
        assert_eq!(policy.delay_for(30), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry("flaky", fast_policy(5), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(Error::Remote("temporary outage".to_owned()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_after_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry("doomed", fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Remote("still down".to_owned())) }
        })
        .await;

        assert!(matches!(
            result,
            Err(Error::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_config_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry("misconfigured", fast_policy(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Config("bad dimension".to_owned())) }
        })
        .await;

        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
