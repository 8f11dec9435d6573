use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{DelayMs, JobEventKind, JobId};

/// Controller event delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub kind: JobEventKind,
    /// Job the event refers to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
    /// Human-readable cause (error message, warning text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Consecutive failure counter for `PollFailed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// Delay before the next action, when one is scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<DelayMs>,
    /// When the event was produced.
    #[serde(with = "time_serde")]
    pub at: SystemTime,
}

impl JobEvent {
    pub fn new(kind: JobEventKind) -> Self {
        Self {
            kind,
            job: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            at: SystemTime::now(),
        }
    }

    pub fn with_job(mut self, job: Option<JobId>) -> Self {
        self.job = job;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: DelayMs) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}

mod time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        (since_epoch.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}
