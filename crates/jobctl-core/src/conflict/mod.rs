use std::sync::Arc;
use std::time::Duration;

use jobctl_client::{ClientError, JobClient};
use jobctl_model::{ActiveJobCheck, JobId};
use tracing::{debug, instrument};

/// Result of asking the backend whether its run slot is taken.
#[derive(Debug)]
pub enum Conflict {
    /// No job is running.
    Clear,
    /// A job is running, possibly submitted by another client.
    Busy(ActiveJobCheck),
    /// The check itself failed.
    Unknown(ClientError),
}

/// Guards the backend's single run slot before a submission.
pub struct ConflictResolver<C> {
    client: Arc<C>,
    settle_delay: Duration,
}

impl<C: JobClient> ConflictResolver<C> {
    pub fn new(client: Arc<C>, settle_delay: Duration) -> Self {
        Self {
            client,
            settle_delay,
        }
    }

    pub async fn check(&self) -> Conflict {
        match self.client.check_active_job().await {
            Ok(check) if check.active => Conflict::Busy(check),
            Ok(_) => Conflict::Clear,
            Err(e) => Conflict::Unknown(e),
        }
    }

    /// Cancel the job holding the run slot and wait for the backend to settle.
    ///
    /// Only acceptance of the cancel request is awaited, not the job's end; the settle delay
    /// covers the window in which the old job is still winding down. The delay is observed
    /// even when the cancel request fails.
    #[instrument(level = "debug", skip(self, job), fields(job = ?job.map(JobId::as_str)))]
    pub async fn clear(&self, job: Option<&JobId>) -> Result<(), ClientError> {
        let result = match self.client.cancel(job).await {
            Err(e) if e.is_nothing_to_cancel() => {
                debug!("conflicting job already gone: {}", e);
                Ok(())
            }
            other => other,
        };
        tokio::time::sleep(self.settle_delay).await;
        result
    }
}
