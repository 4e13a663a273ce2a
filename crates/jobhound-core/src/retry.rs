//! Uniform retry semantics shared by the panel extractor, the session
//! navigation loop and the qualification scorer.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Always `base_delay`
    Fixed,
    /// `base_delay * failures`
    Linear,
    /// `base_delay * factor^(failures - 1)`
    Exponential {
        /// Growth factor per failure
        factor: u32,
    },
}

/// Bounded retry with a configurable backoff function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth function
    pub backoff: Backoff,
}

/// What a retried operation produced.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final result: the first success or the last error
    pub result: Result<T, E>,
    /// Number of failed attempts, never more than `max_attempts`
    pub failures: u32,
}

impl<T, E> RetryOutcome<T, E> {
    /// Whether the operation eventually succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    /// Exponential (doubling) backoff, capped at 30 seconds.
    #[must_use]
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential { factor: 2 },
        }
    }

    /// Constant delay between attempts.
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            max_delay: delay,
            backoff: Backoff::Fixed,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Replace the delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after `failures` failed attempts.
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Linear => self.base_delay.saturating_mul(failures),
            Backoff::Exponential { factor } => {
                let multiplier = factor.max(1).saturating_pow(failures - 1);
                self.base_delay.saturating_mul(multiplier)
            }
        };
        delay.min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts, or `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, R>(
        &self,
        cancel: Option<&CancellationToken>,
        is_retryable: R,
        mut op: F,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut failures = 0;
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        failures,
                    }
                }
                Err(e) => {
                    failures += 1;
                    let cancelled = cancel.is_some_and(CancellationToken::is_cancelled);
                    if attempt >= self.max_attempts || !is_retryable(&e) || cancelled {
                        return RetryOutcome {
                            result: Err(e),
                            failures,
                        };
                    }

                    let delay = self.delay_for(failures);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "attempt failed: {e}, retrying"
                    );

                    if let Some(token) = cancel {
                        tokio::select! {
                            () = token.cancelled() => {
                                return RetryOutcome { result: Err(e), failures };
                            }
                            () = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::exponential(10, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for(8), Duration::from_secs(5));
    }

    #[test]
    fn test_linear_and_fixed() {
        let linear = RetryPolicy {
            backoff: Backoff::Linear,
            ..RetryPolicy::exponential(3, Duration::from_millis(250))
        };
        assert_eq!(linear.delay_for(3), Duration::from_millis(750));

        let fixed = RetryPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(fixed.delay_for(3), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let policy = RetryPolicy::exponential(3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);

        let outcome = policy
            .run(None, |_: &String| true, |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(outcome.result.ok(), Some(2));
        assert_eq!(outcome.failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts() {
        let policy = RetryPolicy::exponential(3, Duration::from_secs(1));
        let outcome: RetryOutcome<(), String> = policy
            .run(None, |_| true, |_| async { Err("down".to_string()) })
            .await;

        assert!(!outcome.is_ok());
        assert_eq!(outcome.failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let policy = RetryPolicy::exponential(5, Duration::from_secs(1));
        let outcome: RetryOutcome<(), String> = policy
            .run(None, |_| false, |_| async { Err("fatal".to_string()) })
            .await;

        assert_eq!(outcome.failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(3600));
        let token = CancellationToken::new();
        let trigger = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let outcome: RetryOutcome<(), String> = policy
            .run(Some(&token), |_| true, |_| async { Err("slow".to_string()) })
            .await;

        assert_eq!(outcome.failures, 1);
    }
}
