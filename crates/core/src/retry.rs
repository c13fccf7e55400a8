//! Retry policy shared by every call to an external service.

use std::fmt::Display;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;

/// Describes how a failed call to an external service is retried.
///
/// Calls are retried with exponential backoff as long as the error is
/// transient and the total retry time stays within `max_retry_time`. A
/// single attempt that runs longer than `attempt_timeout` is abandoned and
/// reported as a timeout, which is itself transient.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the delay between two attempts.
    pub max_interval: Duration,
    /// Total time spent on retries before giving up. Zero disables retries.
    pub max_retry_time: Duration,
    /// Time limit of a single attempt, if any.
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[inline]
    pub fn none() -> Self {
        Self {
            max_retry_time: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Sets the time limit of a single attempt.
    #[inline]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Returns `true` if failed attempts may be repeated.
    #[inline]
    pub fn retries_enabled(&self) -> bool {
        !self.max_retry_time.is_zero()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            max_retry_time: Duration::from_secs(30),
            attempt_timeout: Some(Duration::from_secs(90)),
        }
    }
}

async fn run_attempt<T, E, Fut, O>(
    fut: Fut,
    timeout: Option<Duration>,
    on_timeout: &O,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    O: Fn(Duration) -> E,
{
    let Some(limit) = timeout else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}

/// Runs `op` under `policy`.
///
/// `is_transient` decides whether an error is worth another attempt, and
/// `on_timeout` builds the error reported for an attempt that ran out of
/// time.
pub async fn retry<T, E, F, Fut, C, O>(
    policy: &RetryPolicy,
    mut op: F,
    is_transient: C,
    on_timeout: O,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    O: Fn(Duration) -> E,
    E: Display,
{
    if !policy.retries_enabled() {
        return run_attempt(op(), policy.attempt_timeout, &on_timeout).await;
    }

    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_interval)
        .with_max_interval(policy.max_interval)
        .with_max_elapsed_time(Some(policy.max_retry_time))
        .build();
    backoff::future::retry_notify(
        backoff,
        || {
            let attempt =
                run_attempt(op(), policy.attempt_timeout, &on_timeout);
            let is_transient = &is_transient;
            async move {
                attempt.await.map_err(|err| {
                    if is_transient(&err) {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        },
        |err: E, after: Duration| {
            warn!("transient failure, retrying in {after:?}: {err}");
        },
    )
    .await
}
