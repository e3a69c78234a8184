//! Interval based waiting with an optional deadline and cooperative cancellation.
//!
//! The batch service converges to a status eventually, but gives no upper bound.
//! Without a timeout or a cancelled token, a [`Poller`] waits forever.

use crate::error::BatchError;

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct PollOptions {
    /// Time between two status checks.
    pub interval: Duration,
    /// Give up once this much time has passed. [`None`] waits indefinitely.
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl PollOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Awaits a backend call, giving up with [`BatchError::Cancelled`] once the token fires.
    pub async fn guard<T, F>(&self, what: &str, call: F) -> Result<T, BatchError>
    where
        F: Future<Output = Result<T, BatchError>>,
    {
        cancellable(&self.cancel, what, call).await
    }
}

async fn cancellable<T, F>(
    cancel: &CancellationToken,
    what: &str,
    call: F,
) -> Result<T, BatchError>
where
    F: Future<Output = Result<T, BatchError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BatchError::Cancelled(what.to_string())),
        out = call => out,
    }
}

pub struct Poller {
    what: String,
    interval: Duration,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    ticks: u64,
}

impl Poller {
    /// Starts the clock for waiting on `what`, e.g. `compute environment gpu`.
    pub fn new(options: &PollOptions, what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            interval: options.interval,
            timeout: options.timeout,
            deadline: options.timeout.map(|t| Instant::now() + t),
            cancel: options.cancel.clone(),
            ticks: 0,
        }
    }

    /// Number of completed waits.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Awaits a call made while waiting, so a stuck request does not outlive cancellation.
    pub async fn guard<T, F>(&self, call: F) -> Result<T, BatchError>
    where
        F: Future<Output = Result<T, BatchError>>,
    {
        cancellable(&self.cancel, &self.what, call).await
    }

    /// Sleeps for one interval.
    ///
    /// Fails with [`BatchError::Cancelled`] as soon as the token fires and with
    /// [`BatchError::TimedOut`] when the deadline falls within the interval.
    pub async fn tick(&mut self) -> Result<(), BatchError> {
        if self.cancel.is_cancelled() {
            return Err(BatchError::Cancelled(self.what.clone()));
        }

        let wake = Instant::now() + self.interval;
        if let Some(deadline) = self.deadline {
            if wake > deadline {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        return Err(BatchError::Cancelled(self.what.clone()));
                    }
                    _ = tokio::time::sleep_until(deadline) => {}
                }
                return Err(BatchError::TimedOut {
                    what: self.what.clone(),
                    after: self.timeout.unwrap_or_default(),
                });
            }
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(BatchError::Cancelled(self.what.clone())),
            _ = tokio::time::sleep_until(wake) => {
                self.ticks += 1;
                Ok(())
            }
        }
    }
}
