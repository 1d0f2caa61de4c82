//! Retry policy for upstream calls.
//!
//! Retries only errors accepted by the policy's predicate (rate limiting by
//! default), waiting `multiplier * 2^(attempt-1)` clamped to
//! `[min_wait, max_wait]` between attempts. After `max_attempts` the last
//! error is returned unchanged.

use crate::domain::error::FetchError;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub retry_on: fn(&FetchError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: Duration::from_secs(2),
            min_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(30),
            retry_on: FetchError::is_rate_limited,
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt, after `attempt` (1-based) has failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.multiplier
            .saturating_mul(factor)
            .max(self.min_wait)
            .min(self.max_wait)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    pub fn run<T, F, S>(&self, mut op: F, mut sleep: S) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Result<T, FetchError>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && (self.retry_on)(&err) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying upstream call"
                    );
                    sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_limited() -> FetchError {
        FetchError::RateLimited {
            endpoint: "/equities/bars/daily".into(),
        }
    }

    #[test]
    fn default_schedule_matches_exponential_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
        assert_eq!(policy.delay_after(10), Duration::from_secs(30));
    }

    #[test]
    fn delay_respects_min_wait() {
        let policy = RetryPolicy {
            multiplier: Duration::from_millis(100),
            min_wait: Duration::from_secs(1),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
    }

    #[test]
    fn succeeds_after_rate_limits() {
        let policy = RetryPolicy::default();
        let mut sleeps = Vec::new();
        let result = policy.run(
            |attempt| if attempt < 3 { Err(rate_limited()) } else { Ok(attempt) },
            |d| sleeps.push(d),
        );
        assert_eq!(result, Ok(3));
        assert_eq!(sleeps, vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[test]
    fn reraises_after_exhausting_attempts() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let mut sleeps = 0;
        let result: Result<(), _> = policy.run(
            |_| {
                calls += 1;
                Err(rate_limited())
            },
            |_| sleeps += 1,
        );
        assert_eq!(result, Err(rate_limited()));
        assert_eq!(calls, 3);
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let server_error = FetchError::Http {
            endpoint: "/equities/master".into(),
            status: 500,
            body: "boom".into(),
        };
        let result: Result<(), _> = policy.run(
            |_| {
                calls += 1;
                Err(server_error.clone())
            },
            |_| panic!("must not sleep"),
        );
        assert_eq!(result, Err(server_error));
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_attempts_still_calls_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let mut calls = 0;
        let _: Result<(), _> = policy.run(
            |_| {
                calls += 1;
                Err(rate_limited())
            },
            |_| {},
        );
        assert_eq!(calls, 1);
    }
}
