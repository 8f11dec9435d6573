use std::time::Duration;

use jobctl_model::DelayMs;

use crate::error::ControllerError;

/// Delay growth between consecutive failed status polls.
///
/// The delay after the `n`-th consecutive failure is `first_ms * factor^(n-1)`, capped at `max_ms`.
/// Polling never gives up on its own; a successful poll resets the sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollBackoff {
    pub first_ms: DelayMs,
    pub max_ms: DelayMs,
    pub factor: f64,
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self {
            first_ms: 1_000,
            max_ms: 15_000,
            factor: 2.0,
        }
    }
}

impl PollBackoff {
    /// Retry at a fixed delay, without growth.
    pub fn constant(delay_ms: DelayMs) -> Self {
        Self {
            first_ms: delay_ms,
            max_ms: delay_ms,
            factor: 1.0,
        }
    }

    /// Delay before the next poll after `failures` consecutive failures (`failures >= 1`).
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(63) as i32;
        let ms = (self.first_ms as f64) * self.factor.powi(exp);
        let ms = if ms.is_finite() {
            ms.min(self.max_ms as f64)
        } else {
            self.max_ms as f64
        };
        Duration::from_millis(ms as u64)
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Interval between status polls while the job is queued or running.
    pub poll_interval_ms: DelayMs,
    /// Pause between cancelling a conflicting job and submitting the new one.
    pub settle_delay_ms: DelayMs,
    pub backoff: PollBackoff,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            settle_delay_ms: 500,
            backoff: PollBackoff::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_poll_interval_ms(mut self, ms: DelayMs) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_settle_delay_ms(mut self, ms: DelayMs) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    pub fn with_backoff(mut self, backoff: PollBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.poll_interval_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "poll_interval_ms must be > 0".into(),
            ));
        }
        if self.backoff.first_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "backoff.first_ms must be > 0".into(),
            ));
        }
        if self.backoff.max_ms < self.backoff.first_ms {
            return Err(ControllerError::InvalidConfig(format!(
                "backoff.max_ms ({}) must be >= backoff.first_ms ({})",
                self.backoff.max_ms, self.backoff.first_ms
            )));
        }
        if !(self.backoff.factor.is_finite() && self.backoff.factor >= 1.0) {
            return Err(ControllerError::InvalidConfig(format!(
                "backoff.factor must be >= 1.0, got {}",
                self.backoff.factor
            )));
        }
        Ok(())
    }
}
