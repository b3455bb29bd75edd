use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::{MAX_ATTEMPTS, RETRY_DELAY};

// ─── RetryPolicy ──────────────────────────────────────────────────────────

/// How many times to try an operation and how long to wait between tries.
///
/// There is no exponential backoff and no jitter: every failed attempt is
/// followed by the same `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Same attempt count, no waiting. Used by tests against local mock servers.
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

// ─── RetryExhausted ───────────────────────────────────────────────────────

/// The final failure of a retried operation, tagged with its context label.
#[derive(Debug, Error)]
#[error("{context}: failed after {attempts} attempt(s)")]
pub struct RetryExhausted<E>
where
    E: std::error::Error + 'static,
{
    pub context: String,
    pub attempts: u32,
    #[source]
    pub source: E,
}

impl<E> RetryExhausted<E>
where
    E: std::error::Error + 'static,
{
    pub fn into_inner(self) -> E {
        self.source
    }
}

// ─── with_retry ───────────────────────────────────────────────────────────

/// Run `op` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// Every failed attempt is logged at `warn` with the context label; the
/// final failure is logged at `error` and returned wrapped in
/// [`RetryExhausted`]. A success at any attempt returns immediately.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    context: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    context,
                    attempt,
                    max_attempts,
                    error = %e,
                    "attempt failed, retrying in {}ms",
                    policy.delay.as_millis()
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(context, attempts = attempt, error = %e, "giving up");
                return Err(RetryExhausted {
                    context: context.to_string(),
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Error, PartialEq)]
    #[error("boom {0}")]
    struct Boom(u32);

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let calls = Cell::new(0);
        let result = with_retry(&RetryPolicy::immediate(), "flaky", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(Boom(n))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn always_failing_stops_after_three_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(&RetryPolicy::immediate(), "broken", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Err(Boom(n)) }
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(calls.get(), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.context, "broken");
        // The last error is the one propagated.
        assert_eq!(err.source, Boom(3));
        assert_eq!(err.to_string(), "broken: failed after 3 attempt(s)");
        assert_eq!(std::error::Error::source(&err).unwrap().to_string(), "boom 3");
    }

    #[tokio::test]
    async fn first_success_does_not_retry() {
        let calls = Cell::new(0);
        let result = with_retry(&RetryPolicy::default(), "ok", || {
            calls.set(calls.get() + 1);
            async { Ok::<_, Boom>(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        let result: Result<(), _> = with_retry(&policy, "zero", || {
            calls.set(calls.get() + 1);
            async { Err(Boom(0)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn waits_the_fixed_delay_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(50),
        };
        let start = std::time::Instant::now();
        let _: Result<(), _> = with_retry(&policy, "slow", || async { Err(Boom(1)) }).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn default_policy_matches_shared_constants() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(2000));
    }
}
