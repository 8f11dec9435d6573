use serde::{Deserialize, Serialize};

use crate::{ControllerState, JobId};

/// Everything a consumer needs to render the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    /// Job owned by the controller, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
    /// Authoritative log of the owned job.
    pub logs: Vec<String>,
    /// Set once `Completed` with a produced result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
    /// Set once `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal condition worth showing: a job that finished without a result,
    /// or a cancel request the backend did not accept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ControllerSnapshot {
    /// `Completed` without a result reference.
    pub fn finished_without_result(&self) -> bool {
        self.state == ControllerState::Completed && self.result_ref.is_none()
    }
}
