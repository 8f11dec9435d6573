use async_trait::async_trait;
use jobctl_model::{ActiveJobCheck, JobId, JobPayload, JobStatus, RunOptions};

use crate::errors::ClientError;

/// Remote operations the job controller needs from the backend.
///
/// Implementations hold no job state; every call maps one request to one response.
#[async_trait]
pub trait JobClient: Send + Sync + 'static {
    /// Create a job. Never retried: submission is not idempotent.
    async fn submit(&self, payload: &JobPayload, options: &RunOptions)
    -> Result<JobId, ClientError>;

    /// Read the current status and full log of a job.
    async fn fetch_status(&self, job: &JobId) -> Result<JobStatus, ClientError>;

    /// Cancel whatever job currently holds the backend run slot.
    ///
    /// `job` is informational: the backend has a single global slot and cancels its active job.
    async fn cancel(&self, job: Option<&JobId>) -> Result<(), ClientError>;

    /// Ask whether any client's job is running on the backend.
    async fn check_active_job(&self) -> Result<ActiveJobCheck, ClientError>;
}
