use serde::{Deserialize, Serialize};

use crate::JobState;

/// Snapshot of a remote job's progress.
///
/// `logs` is the authoritative log as reported by the backend: every poll may carry the full
/// history so far, so consumers replace their buffer with it instead of appending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: JobState,
    #[serde(default)]
    pub logs: Vec<String>,
    /// Reference to the produced artifact. Only set for `complete` jobs that produced a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            logs: Vec::new(),
            result_ref: None,
        }
    }

    pub fn with_logs<I, S>(mut self, logs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.logs = logs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_result_ref(mut self, result_ref: impl Into<String>) -> Self {
        self.result_ref = Some(result_ref.into());
        self
    }
}
