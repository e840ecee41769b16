//! Poll-until-done with a delay schedule and cooperative cancellation.
//!
//! Every wait in a dictation session (page load, transcript retrieval,
//! assistant reply) runs through [`poll`]. Sleeps are plain blocking sleeps;
//! callers run on worker threads.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Delays before each attempt. The last step repeats until the attempt
/// budget runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    steps: Vec<Duration>,
    max_attempts: usize,
}

impl Backoff {
    /// Same delay before each of `max_attempts` attempts.
    pub fn attempts(delay: Duration, max_attempts: usize) -> Self {
        Self {
            steps: vec![delay],
            max_attempts,
        }
    }

    /// Poll every `interval` until `timeout` has been spent.
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            (timeout.as_millis() / interval.as_millis()).max(1) as usize
        };
        Self::attempts(interval, attempts)
    }

    /// One attempt per listed delay.
    pub fn schedule(steps: Vec<Duration>) -> Self {
        let max_attempts = steps.len();
        Self {
            steps,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before attempt `attempt` (0-based).
    pub fn delay(&self, attempt: usize) -> Duration {
        self.steps
            .get(attempt)
            .or_else(|| self.steps.last())
            .copied()
            .unwrap_or_default()
    }

    /// Sum of every delay in the budget.
    pub fn total(&self) -> Duration {
        (0..self.max_attempts).map(|i| self.delay(i)).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("gave up after {attempts} attempts")]
    TimedOut { attempts: usize },
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: usize },
}

/// Sleep, check `proceed`, probe; repeat until the probe breaks or the
/// budget is spent. `proceed` is read once per iteration, after the sleep.
pub fn poll<T>(
    backoff: &Backoff,
    proceed: Option<&AtomicBool>,
    mut probe: impl FnMut(usize) -> ControlFlow<T>,
) -> Result<T, PollError> {
    for attempt in 0..backoff.max_attempts() {
        let delay = backoff.delay(attempt);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        if let Some(flag) = proceed {
            if !flag.load(Ordering::SeqCst) {
                return Err(PollError::Cancelled { attempts: attempt });
            }
        }

        if let ControlFlow::Break(value) = probe(attempt) {
            return Ok(value);
        }
    }
    Err(PollError::TimedOut {
        attempts: backoff.max_attempts(),
    })
}
