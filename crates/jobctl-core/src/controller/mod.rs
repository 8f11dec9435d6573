use std::sync::Arc;

use jobctl_client::JobClient;
use jobctl_model::{
    ConflictDecision, ControllerSnapshot, ControllerState, JobEvent, JobEventKind, JobId,
    JobPayload, RunOptions,
};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::conflict::{Conflict, ConflictResolver};
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::polling::PollingLoop;
use crate::state::{CancelPlan, ControllerStore, RunSink};
use crate::subscriber::Subscribe;

/// Builder for [`JobController`].
pub struct ControllerBuilder<C> {
    client: Arc<C>,
    config: ControllerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<C: JobClient> ControllerBuilder<C> {
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn build(self) -> Result<JobController<C>, ControllerError> {
        self.config.validate()?;
        let resolver = ConflictResolver::new(Arc::clone(&self.client), self.config.settle_delay());
        Ok(JobController {
            client: self.client,
            config: self.config,
            resolver,
            store: Arc::new(ControllerStore::new(self.subscribers)),
        })
    }
}

/// Drives one remote job at a time from submission to a terminal state.
///
/// Every public operation checks the current [`ControllerState`] first and is rejected with
/// [`ControllerError::Busy`] when it does not apply, before any request is sent. Errors of the job
/// itself never come back as `Err`: they end up in the [`ControllerSnapshot`].
///
/// Polling runs on a spawned tokio task, so the controller must be used inside a tokio runtime.
/// Dropping the controller stops that task.
pub struct JobController<C: JobClient> {
    client: Arc<C>,
    config: ControllerConfig,
    resolver: ConflictResolver<C>,
    store: Arc<ControllerStore>,
}

impl<C: JobClient> JobController<C> {
    pub fn builder(client: Arc<C>) -> ControllerBuilder<C> {
        ControllerBuilder {
            client,
            config: ControllerConfig::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn new(client: Arc<C>, config: ControllerConfig) -> Result<Self, ControllerError> {
        Self::builder(client).with_config(config).build()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> ControllerState {
        self.store.state()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.store.snapshot()
    }

    pub fn logs(&self) -> Vec<String> {
        self.store.snapshot().logs
    }

    pub fn result_ref(&self) -> Option<String> {
        self.store.snapshot().result_ref
    }

    pub fn error_detail(&self) -> Option<String> {
        self.store.snapshot().error
    }

    /// Receiver that is notified on every snapshot change.
    pub fn subscribe_state(&self) -> watch::Receiver<ControllerSnapshot> {
        self.store.subscribe()
    }

    /// Submit a new job.
    ///
    /// Accepted from `Idle` and terminal states; the previous job, its logs and its result are
    /// discarded. Returns once the job is being polled, once the caller has to decide about a
    /// conflicting job (`AwaitingConflictDecision`), or once submission failed (`Failed`).
    #[instrument(
        level = "debug",
        skip(self, payload, options),
        fields(verbose = options.verbose, delay_ms = options.delay_ms)
    )]
    pub async fn start(
        &self,
        payload: JobPayload,
        options: RunOptions,
    ) -> Result<(), ControllerError> {
        let run = self.store.begin_start(payload, options)?;
        self.store.emit(JobEvent::new(JobEventKind::StartRequested));

        match self.resolver.check().await {
            Conflict::Clear => {}
            Conflict::Unknown(e) => {
                warn!("active job check failed, assuming the run slot is free: {}", e);
                self.store.emit(
                    JobEvent::new(JobEventKind::ActiveCheckFailed).with_reason(e.to_string()),
                );
            }
            Conflict::Busy(check) => {
                let existing = check.job.clone();
                if self.store.await_decision(run, check) {
                    info!(
                        existing = ?existing.as_ref().map(JobId::as_str),
                        "another job is running; waiting for a decision"
                    );
                    self.store
                        .emit(JobEvent::new(JobEventKind::ConflictDetected).with_job(existing));
                }
                return Ok(());
            }
        }

        self.submit(run).await;
        Ok(())
    }

    /// Answer a pending conflict. Valid only in `AwaitingConflictDecision`.
    #[instrument(level = "debug", skip(self, decision), fields(decision = decision.as_str()))]
    pub async fn resolve_conflict(&self, decision: ConflictDecision) -> Result<(), ControllerError> {
        match decision {
            ConflictDecision::Abort => {
                self.store.abort_conflict()?;
                info!("conflict resolved: leaving the running job alone");
                self.store.emit(JobEvent::new(JobEventKind::ConflictAborted));
                Ok(())
            }
            ConflictDecision::CancelAndRun => {
                let (run, existing) = self.store.accept_conflict()?;
                info!("conflict resolved: cancelling the running job");

                match self.resolver.clear(existing.as_ref()).await {
                    Ok(()) => self.store.emit(
                        JobEvent::new(JobEventKind::ExistingJobCancelled).with_job(existing),
                    ),
                    Err(e) => {
                        warn!("failed to cancel the running job, submitting anyway: {}", e);
                        self.store.emit(
                            JobEvent::new(JobEventKind::CancelFailed)
                                .with_job(existing)
                                .with_reason(e.to_string()),
                        );
                    }
                }

                self.submit(run).await;
                Ok(())
            }
        }
    }

    /// Stop the current job.
    ///
    /// Valid from `Submitting` and `Polling`; a no-op from `Cancelling` and `Cancelled`. The poll
    /// loop is stopped before the cancel request goes out and no status request is issued after
    /// this returns. Ends in `Cancelled` within one poll interval even when the backend rejects
    /// the request or does not answer; the failure is kept as the snapshot's warning.
    #[instrument(level = "debug", skip(self))]
    pub async fn cancel(&self) -> Result<(), ControllerError> {
        let (run, job, poll) = match self.store.begin_cancel()? {
            CancelPlan::AlreadyCancelled => {
                debug!("cancel ignored: already cancelled");
                return Ok(());
            }
            CancelPlan::Proceed { run, job, poll } => (run, job, poll),
        };
        self.store
            .emit(JobEvent::new(JobEventKind::CancelRequested).with_job(job.clone()));

        if let Some(poll) = poll
            && let Err(e) = poll.await
            && e.is_panic()
        {
            error!("poll task panicked: {}", e);
        }

        let warning = match self.send_cancel(job.clone()).await {
            Ok(()) => None,
            Err(reason) => {
                self.store.emit(
                    JobEvent::new(JobEventKind::CancelFailed)
                        .with_job(job.clone())
                        .with_reason(reason.clone()),
                );
                Some(reason)
            }
        };

        if self.store.finish_cancel(run, warning) {
            info!(job = ?job.as_ref().map(JobId::as_str), "job cancelled");
            self.store
                .emit(JobEvent::new(JobEventKind::Cancelled).with_job(job));
        }
        Ok(())
    }

    /// Send the backend cancel, waiting at most one poll interval for its answer.
    ///
    /// An unanswered request is left running on its own task.
    async fn send_cancel(&self, job: Option<JobId>) -> Result<(), String> {
        let budget = self.config.poll_interval();
        let client = Arc::clone(&self.client);
        let request = tokio::spawn(async move { client.cancel(job.as_ref()).await });

        match timeout(budget, request).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) if e.is_nothing_to_cancel() => {
                debug!("backend had nothing to cancel: {}", e);
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                warn!("cancel request failed; marking the job cancelled anyway: {}", e);
                Err(e.to_string())
            }
            Ok(Err(e)) => {
                error!("cancel request task failed: {}", e);
                Err(format!("cancel request aborted: {e}"))
            }
            Err(_) => {
                warn!(
                    budget_ms = budget.as_millis() as u64,
                    "cancel request unanswered; marking the job cancelled anyway"
                );
                Err(format!(
                    "cancel request unanswered after {} ms",
                    budget.as_millis()
                ))
            }
        }
    }

    /// Return to `Idle`, dropping the previous job, logs and result.
    pub fn reset(&self) -> Result<(), ControllerError> {
        self.store.reset()?;
        self.store.emit(JobEvent::new(JobEventKind::Reset));
        Ok(())
    }

    async fn submit(&self, run: u64) {
        let Some(pending) = self.store.take_pending(run) else {
            debug!("run cancelled before submission");
            return;
        };

        match self.client.submit(&pending.payload, &pending.options).await {
            Ok(job) => self.begin_polling(run, job).await,
            Err(e) => {
                if self.store.fail_submission(run, e.to_string()) {
                    error!("{}", e);
                    self.store
                        .emit(JobEvent::new(JobEventKind::SubmitFailed).with_reason(e.to_string()));
                } else {
                    debug!("submission failed after the run was cancelled: {}", e);
                }
            }
        }
    }

    async fn begin_polling(&self, run: u64, job: JobId) {
        let Some(token) = self.store.begin_polling(run, job.clone()) else {
            warn!(job = %job, "job accepted after cancellation; sending a follow-up cancel");
            if let Err(e) = self.client.cancel(Some(&job)).await
                && !e.is_nothing_to_cancel()
            {
                warn!(job = %job, "follow-up cancel failed: {}", e);
            }
            return;
        };

        info!(job = %job, "job submitted; polling status");
        self.store
            .emit(JobEvent::new(JobEventKind::Submitted).with_job(Some(job.clone())));

        let sink = RunSink::new(Arc::clone(&self.store), run, job.clone());
        let poll = PollingLoop::new(Arc::clone(&self.client), job, &self.config, token, sink);
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            let outcome = poll.run().await;
            store.finish_polling(run, outcome);
        });
        self.store.attach_poll_handle(run, handle);
    }
}

impl<C: JobClient> Drop for JobController<C> {
    fn drop(&mut self) {
        self.store.shutdown();
    }
}

#[cfg(test)]
mod tests;
