//! Multiplicative backoff and the run-wide retry budget.

use crate::{Phase, ProvisionError};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Retry delay that grows by a fixed factor after each failed attempt,
/// saturating at `max`.
///
/// One instance per operation, so every operation starts again at `base`.
#[derive(Debug, Clone)]
pub struct Backoff {
    factor: f64,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Start at `base` (clamped to `max`), multiplying by `factor` on every
    /// [`grow`](Self::grow).
    pub fn new(base: Duration, factor: f64, max: Duration) -> Self {
        Self {
            factor,
            max,
            current: base.min(max),
        }
    }

    /// The wait for the current attempt.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Advance to the next attempt's wait.
    pub fn grow(&mut self) -> Duration {
        let next = self.current.as_secs_f64() * self.factor;
        self.current = Duration::try_from_secs_f64(next)
            .map_or(self.max, |next| next.min(self.max));
        self.current
    }
}

/// Deadline and cancellation shared by every retry loop in a run.
#[derive(Debug, Clone)]
pub struct Budget {
    deadline: Option<(Instant, Duration)>,
    cancel: CancellationToken,
}

impl Budget {
    /// Budget expiring `deadline` from now, cancelled with `cancel`.
    pub fn new(deadline: Option<Duration>, cancel: CancellationToken) -> Self {
        Self {
            deadline: deadline.map(|d| (Instant::now() + d, d)),
            cancel,
        }
    }

    /// No deadline, never cancelled.
    pub fn unbounded() -> Self {
        Self::new(None, CancellationToken::new())
    }

    /// Fail if the run was cancelled or its deadline has passed.
    pub fn check(&self, phase: Phase) -> Result<(), ProvisionError> {
        if self.cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled(phase));
        }
        match self.deadline {
            Some((at, deadline)) if Instant::now() >= at => {
                Err(ProvisionError::DeadlineExceeded { phase, deadline })
            }
            _ => Ok(()),
        }
    }

    /// Sleep for `wait`, cut short by cancellation or the deadline.
    pub async fn sleep(&self, phase: Phase, wait: Duration) -> Result<(), ProvisionError> {
        self.check(phase)?;

        let wake = Instant::now() + wait;
        let until = match self.deadline {
            Some((at, _)) => wake.min(at),
            None => wake,
        };

        debug!(?wait, %phase, "Backing off");
        tokio::select! {
            _ = sleep_until(until) => {}
            _ = self.cancel.cancelled() => {}
        }

        self.check(phase)
    }
}
