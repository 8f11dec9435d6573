mod job_id;
pub use job_id::JobId;

mod job_state;
pub use job_state::JobState;

mod job_status;
pub use job_status::JobStatus;

mod active_job;
pub use active_job::ActiveJobCheck;

mod run_options;
pub use run_options::RunOptions;

mod payload;
pub use payload::JobPayload;

/// Delay value in milliseconds.
///
/// Used by run options and controller timing where an explicit duration is passed around as an integer.
pub type DelayMs = u64;
