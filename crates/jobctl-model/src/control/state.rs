use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of the client-side job controller.
///
/// Exactly one phase is current at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControllerState {
    /// No job owned, nothing in flight.
    #[default]
    Idle,
    /// Checking the backend run slot and submitting the job.
    Submitting,
    /// Another job holds the backend run slot; waiting for the caller to decide.
    AwaitingConflictDecision,
    /// Job submitted; status is being polled.
    Polling,
    /// Poll timer stopped; the cancel request is in flight.
    Cancelling,
    /// Job finished. A result reference may or may not be present.
    Completed,
    /// Submission failed or the backend reported an error.
    Failed,
    /// Job cancelled by the caller.
    Cancelled,
}

impl ControllerState {
    /// Returns `true` for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerState::Completed | ControllerState::Failed | ControllerState::Cancelled
        )
    }

    /// Returns `true` if `start()` is accepted in this phase.
    pub fn can_start(&self) -> bool {
        matches!(self, ControllerState::Idle) || self.is_terminal()
    }

    /// Returns `true` if `cancel()` has something to stop in this phase.
    pub fn can_cancel(&self) -> bool {
        matches!(self, ControllerState::Polling | ControllerState::Submitting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Idle => "idle",
            ControllerState::Submitting => "submitting",
            ControllerState::AwaitingConflictDecision => "awaiting-conflict-decision",
            ControllerState::Polling => "polling",
            ControllerState::Cancelling => "cancelling",
            ControllerState::Completed => "completed",
            ControllerState::Failed => "failed",
            ControllerState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
