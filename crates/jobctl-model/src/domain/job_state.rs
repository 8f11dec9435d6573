use serde::{Deserialize, Serialize};

/// Server-reported execution state of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Accepted by the backend, not started yet.
    Queued,
    /// Currently executing.
    #[serde(alias = "in-progress")]
    Running,
    /// Finished; a result may or may not have been produced.
    Complete,
    /// Finished with an error.
    Error,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Complete => "complete",
            JobState::Error => "error",
        }
    }
}
