use std::future::{Future, pending};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use jobctl_client::{ClientError, JobClient};
use jobctl_model::{JobId, JobState, JobStatus};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::{ControllerConfig, PollBackoff};

type StatusRequest = Pin<Box<dyn Future<Output = (u64, Result<JobStatus, ClientError>)> + Send>>;

/// Where a [`PollingLoop`] reports progress.
pub trait PollSink: Send + Sync {
    /// Publish the current log buffer.
    ///
    /// Returning `false` means the owner no longer tracks this job; the loop stops.
    fn publish_logs(&self, logs: &[String]) -> bool;

    /// A status request failed; the next one is scheduled after `next`.
    fn poll_failed(&self, _failures: u32, _next: Duration, _error: &ClientError) {}

    /// Request `seq` got no answer before the next tick and was dropped.
    fn request_abandoned(&self, _seq: u64) {}
}

/// How a [`PollingLoop`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Backend reported `complete`. `result_ref` is `None` when no result was produced.
    Completed { result_ref: Option<String> },
    /// Backend reported `error`.
    Failed,
    /// Cancelled through the token, or the sink detached.
    Stopped,
}

/// Polls a job's status until it reaches a terminal state.
///
/// One tick fires every poll interval. Each tick issues a fresh status request and drops the
/// previous one if it is still unanswered, so at most one request is in flight and only the
/// newest one can change state. Failed requests never end the loop: the next tick is pushed out
/// according to [`PollBackoff`] and the sequence resets on the first success.
pub struct PollingLoop<C, S> {
    client: Arc<C>,
    job: JobId,
    interval: Duration,
    backoff: PollBackoff,
    token: CancellationToken,
    sink: S,
    logs: Vec<String>,
}

impl<C, S> PollingLoop<C, S>
where
    C: JobClient,
    S: PollSink,
{
    pub fn new(
        client: Arc<C>,
        job: JobId,
        config: &ControllerConfig,
        token: CancellationToken,
        sink: S,
    ) -> Self {
        Self {
            client,
            job,
            interval: config.poll_interval(),
            backoff: config.backoff,
            token,
            sink,
            logs: Vec::new(),
        }
    }

    pub async fn run(mut self) -> PollOutcome {
        let deadline = sleep_until(Instant::now() + self.interval);
        tokio::pin!(deadline);

        let mut in_flight: Option<StatusRequest> = None;
        let mut seq: u64 = 0;
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => {
                    debug!(job = %self.job, "polling stopped");
                    return PollOutcome::Stopped;
                }

                (done, result) = next_response(&mut in_flight) => {
                    in_flight = None;
                    match result {
                        Ok(status) => {
                            failures = 0;
                            trace!(
                                job = %self.job,
                                seq = done,
                                state = status.state.as_str(),
                                lines = status.logs.len(),
                                "status received"
                            );
                            if let Some(outcome) = self.apply(status) {
                                return outcome;
                            }
                        }
                        Err(e) => {
                            failures = failures.saturating_add(1);
                            let next = self.delay(failures);
                            warn!(
                                job = %self.job,
                                attempt = failures,
                                delay_ms = next.as_millis() as u64,
                                "status poll failed: {}", e
                            );
                            self.sink.poll_failed(failures, next, &e);
                            deadline.as_mut().reset(Instant::now() + next);
                        }
                    }
                }

                () = &mut deadline => {
                    if in_flight.take().is_some() {
                        debug!(job = %self.job, seq, "status request unanswered; abandoning it");
                        self.sink.request_abandoned(seq);
                    }
                    seq += 1;
                    in_flight = Some(self.request(seq));
                    deadline.as_mut().reset(Instant::now() + self.delay(failures));
                }
            }
        }
    }

    fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            self.interval
        } else {
            self.backoff.delay(failures)
        }
    }

    fn request(&self, seq: u64) -> StatusRequest {
        let client = Arc::clone(&self.client);
        let job = self.job.clone();
        Box::pin(async move { (seq, client.fetch_status(&job).await) })
    }

    /// Replace the log buffer and map the job state. `Some` ends the loop.
    fn apply(&mut self, status: JobStatus) -> Option<PollOutcome> {
        let JobStatus {
            state,
            logs,
            result_ref,
        } = status;

        // The buffer never shrinks while polling.
        if logs.len() >= self.logs.len() {
            self.logs = logs;
        } else {
            debug!(
                job = %self.job,
                kept = self.logs.len(),
                received = logs.len(),
                "ignoring log shorter than the one already seen"
            );
        }

        if !self.sink.publish_logs(&self.logs) {
            debug!(job = %self.job, "job no longer tracked; polling stopped");
            return Some(PollOutcome::Stopped);
        }

        match state {
            JobState::Queued | JobState::Running => None,
            JobState::Complete => Some(PollOutcome::Completed { result_ref }),
            JobState::Error => Some(PollOutcome::Failed),
        }
    }
}

async fn next_response(
    in_flight: &mut Option<StatusRequest>,
) -> (u64, Result<JobStatus, ClientError>) {
    match in_flight.as_mut() {
        Some(request) => request.await,
        None => pending().await,
    }
}
