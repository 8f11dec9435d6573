use serde::{Deserialize, Serialize};

/// What happened inside the job controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobEventKind {
    // start
    /// `start()` accepted; previous job state discarded.
    StartRequested,
    /// The active-job check failed; treated as "no running job".
    ActiveCheckFailed,
    /// Another job holds the backend run slot.
    ConflictDetected,
    /// Caller chose to leave the running job alone.
    ConflictAborted,
    /// Cancel request for the conflicting job was accepted.
    ExistingJobCancelled,
    /// Backend accepted the job.
    Submitted,
    /// Backend rejected the job or was unreachable.
    SubmitFailed,

    // polling
    /// A status request failed; polling continues.
    PollFailed,
    /// A status request was superseded by a newer tick and abandoned.
    StaleResponseDiscarded,

    // terminal
    /// Job finished with a result reference.
    Completed,
    /// Job finished but produced no result.
    CompletedWithoutResult,
    /// Backend reported an error status.
    Failed,

    // cancel
    /// `cancel()` accepted; poll timer stopped.
    CancelRequested,
    /// Backend did not accept the cancel request.
    CancelFailed,
    /// Controller reached `Cancelled`.
    Cancelled,

    // management
    /// Controller returned to `Idle`.
    Reset,
}
