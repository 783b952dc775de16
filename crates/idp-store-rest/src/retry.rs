//! Bounded retries with exponential backoff for store lookups.

use idp_core::store::Error;
use std::future::Future;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(2);

/// How often and how patiently a lookup is repeated when the backend reports a transient failure.
///
/// Only errors whose [`ErrorKind`](idp_core::store::ErrorKind) is transient are retried. Not found
/// is an answer, not a failure, and is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and gives up.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Sets the total number of attempts, the first one included. Values below 1 are taken as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the wait before the first retry. Every further retry waits twice as long as the one
    /// before.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Caps the wait between two attempts.
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// The total number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    // Wait after the given failed attempt, attempts counting from 1.
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    pub(crate) async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let backoff = self.backoff(attempt);
                    tracing::warn!(attempt, ?backoff, error = %e, "transient store failure, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_core::store::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(10), Duration::from_secs(2));
        assert_eq!(policy.backoff(100), Duration::from_secs(2));
    }

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_only() {
        let policy = RetryPolicy::default();

        for (kind, expected_calls) in [(ErrorKind::Unavailable, 3), (ErrorKind::PermissionDenied, 1), (ErrorKind::MalformedResponse, 1)] {
            let counter = AtomicU32::new(0);
            let calls = &counter;
            let result: Result<(), Error> = policy
                .run(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::from(kind))
                })
                .await;
            assert_eq!(result.unwrap_err().kind(), kind);
            assert_eq!(counter.load(Ordering::SeqCst), expected_calls);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = RetryPolicy::default()
            .run(move || async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(Error::from(ErrorKind::Unavailable)),
                    n => Ok(n),
                }
            })
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
