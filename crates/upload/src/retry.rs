//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{DEFAULT_CHUNK_RETRIES, DEFAULT_INITIAL_RETRY_DELAY};

/// Marker returned when a backoff wait is interrupted by cancellation.
///
/// Callers convert this into their own error type via `From`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Retries an async operation with doubling delays between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_RETRIES, DEFAULT_INITIAL_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries after the
    /// initial attempt, starting with `initial_delay` between attempts.
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay: None,
        }
    }

    /// Caps the doubling delay at `cap`.
    pub fn with_max_delay(mut self, cap: Duration) -> Self {
        self.max_delay = Some(cap);
        self
    }

    /// Runs `op` up to `max_retries + 1` times.
    ///
    /// After each failed attempt with attempts remaining, calls
    /// `on_failure(attempt, &err)` (advisory only), sleeps for the
    /// current delay, then doubles it. The final failure is returned
    /// untouched. A cancellation during a backoff wait resolves to
    /// `E::from(Interrupted)`.
    pub async fn execute<T, E, F, Fut, C>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
        mut on_failure: C,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnMut(u32, &E),
        E: From<Interrupted>,
    {
        let total_attempts = self.max_retries + 1;
        let mut delay = self.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= total_attempts {
                        return Err(err);
                    }
                    on_failure(attempt, &err);

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(E::from(Interrupted)),
                        _ = tokio::time::sleep(delay) => {}
                    }

                    delay = match self.max_delay {
                        Some(cap) => (delay * 2).min(cap),
                        None => delay * 2,
                    };
                }
            }
        }
    }
}
