use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use jobctl_client::ClientError;
use jobctl_model::{
    ActiveJobCheck, ControllerSnapshot, ControllerState, JobEvent, JobEventKind, JobId,
    JobPayload, RunOptions,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ControllerError;
use crate::polling::{PollOutcome, PollSink};
use crate::subscriber::Subscribe;

const NO_RESULT_WARNING: &str = "job finished without producing a result";
const ERROR_STATUS: &str = "backend reported an error status";

/// Job accepted by `start()` and not submitted yet.
pub(crate) struct PendingRun {
    pub(crate) payload: JobPayload,
    pub(crate) options: RunOptions,
    pub(crate) conflict: Option<ActiveJobCheck>,
}

/// Poll loop owned by the current run.
struct PollTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollTask {
    fn stop(self) -> Option<JoinHandle<()>> {
        self.token.cancel();
        self.handle
    }
}

/// What `cancel()` has to do after the state check.
pub(crate) enum CancelPlan {
    AlreadyCancelled,
    Proceed {
        run: u64,
        job: Option<JobId>,
        poll: Option<JoinHandle<()>>,
    },
}

struct Inner {
    snapshot: ControllerSnapshot,
    /// Bumped by every `start()`; work carrying an older value must not touch state.
    run: u64,
    pending: Option<PendingRun>,
    poll: Option<PollTask>,
}

impl Inner {
    fn is(&self, run: u64, state: ControllerState) -> bool {
        self.run == run && self.snapshot.state == state
    }
}

/// Controller state shared between the public API and the poll task.
///
/// All transitions happen under one lock; every change is republished to `watch` subscribers.
pub(crate) struct ControllerStore {
    inner: Mutex<Inner>,
    tx: watch::Sender<ControllerSnapshot>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ControllerStore {
    pub(crate) fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let (tx, _) = watch::channel(ControllerSnapshot::default());
        Self {
            inner: Mutex::new(Inner {
                snapshot: ControllerSnapshot::default(),
                run: 0,
                pending: None,
                poll: None,
            }),
            tx,
            subscribers,
        }
    }

    pub(crate) fn snapshot(&self) -> ControllerSnapshot {
        self.tx.borrow().clone()
    }

    pub(crate) fn state(&self) -> ControllerState {
        self.tx.borrow().state
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.tx.subscribe()
    }

    /// Deliver an event to every subscriber. Never called with the lock held.
    pub(crate) fn emit(&self, event: JobEvent) {
        for sub in &self.subscribers {
            sub.on_event(&event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The state is plain data; a panic mid-update cannot leave it half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.tx.send_replace(inner.snapshot.clone());
    }

    /// Enter `Submitting` with a clean slate. Returns the new run number.
    pub(crate) fn begin_start(
        &self,
        payload: JobPayload,
        options: RunOptions,
    ) -> Result<u64, ControllerError> {
        let mut inner = self.lock();
        let state = inner.snapshot.state;
        if !state.can_start() {
            return Err(ControllerError::busy("start", state));
        }

        inner.run += 1;
        inner.snapshot = ControllerSnapshot {
            state: ControllerState::Submitting,
            ..Default::default()
        };
        inner.pending = Some(PendingRun {
            payload,
            options,
            conflict: None,
        });
        if let Some(poll) = inner.poll.take() {
            poll.stop();
        }
        self.publish(&inner);
        Ok(inner.run)
    }

    pub(crate) fn await_decision(&self, run: u64, check: ActiveJobCheck) -> bool {
        let mut inner = self.lock();
        if !inner.is(run, ControllerState::Submitting) {
            return false;
        }
        inner.snapshot.state = ControllerState::AwaitingConflictDecision;
        if let Some(pending) = inner.pending.as_mut() {
            pending.conflict = Some(check);
        }
        self.publish(&inner);
        true
    }

    pub(crate) fn abort_conflict(&self) -> Result<(), ControllerError> {
        let mut inner = self.lock();
        let state = inner.snapshot.state;
        if state != ControllerState::AwaitingConflictDecision {
            return Err(ControllerError::busy("resolve a conflict", state));
        }
        inner.snapshot = ControllerSnapshot::default();
        inner.pending = None;
        self.publish(&inner);
        Ok(())
    }

    /// Leave `AwaitingConflictDecision` for `Submitting`. Returns the run and the conflicting job.
    pub(crate) fn accept_conflict(&self) -> Result<(u64, Option<JobId>), ControllerError> {
        let mut inner = self.lock();
        let state = inner.snapshot.state;
        if state != ControllerState::AwaitingConflictDecision {
            return Err(ControllerError::busy("resolve a conflict", state));
        }
        inner.snapshot.state = ControllerState::Submitting;
        let existing = inner
            .pending
            .as_mut()
            .and_then(|p| p.conflict.take())
            .and_then(|c| c.job);
        self.publish(&inner);
        Ok((inner.run, existing))
    }

    /// Hand out the payload for submission if `run` is still submitting.
    pub(crate) fn take_pending(&self, run: u64) -> Option<PendingRun> {
        let mut inner = self.lock();
        if !inner.is(run, ControllerState::Submitting) {
            return None;
        }
        inner.pending.take()
    }

    pub(crate) fn fail_submission(&self, run: u64, reason: String) -> bool {
        let mut inner = self.lock();
        if !inner.is(run, ControllerState::Submitting) {
            return false;
        }
        inner.snapshot.state = ControllerState::Failed;
        inner.snapshot.error = Some(reason);
        self.publish(&inner);
        true
    }

    /// Enter `Polling` for `job`. `None` if the run was cancelled or superseded meanwhile.
    pub(crate) fn begin_polling(&self, run: u64, job: JobId) -> Option<CancellationToken> {
        let mut inner = self.lock();
        if !inner.is(run, ControllerState::Submitting) {
            return None;
        }
        let token = CancellationToken::new();
        if let Some(old) = inner.poll.replace(PollTask {
            token: token.clone(),
            handle: None,
        }) {
            old.stop();
        }
        inner.snapshot.state = ControllerState::Polling;
        inner.snapshot.job = Some(job);
        self.publish(&inner);
        Some(token)
    }

    pub(crate) fn attach_poll_handle(&self, run: u64, handle: JoinHandle<()>) {
        let mut inner = self.lock();
        if inner.run != run {
            return;
        }
        if let Some(poll) = inner.poll.as_mut()
            && poll.handle.is_none()
        {
            poll.handle = Some(handle);
        }
    }

    fn update_logs(&self, run: u64, logs: &[String]) -> bool {
        let mut inner = self.lock();
        if !inner.is(run, ControllerState::Polling) {
            return false;
        }
        if inner.snapshot.logs != logs {
            inner.snapshot.logs = logs.to_vec();
            self.publish(&inner);
        }
        true
    }

    /// Apply the end of a poll loop to `run`, if it still owns the controller.
    pub(crate) fn finish_polling(&self, run: u64, outcome: PollOutcome) {
        let event = {
            let mut inner = self.lock();
            if !inner.is(run, ControllerState::Polling) {
                return;
            }
            let job = inner.snapshot.job.clone();
            let kind = match outcome {
                PollOutcome::Completed {
                    result_ref: Some(result_ref),
                } => {
                    info!(job = ?job.as_ref().map(JobId::as_str), %result_ref, "job completed");
                    inner.snapshot.state = ControllerState::Completed;
                    inner.snapshot.result_ref = Some(result_ref);
                    JobEventKind::Completed
                }
                PollOutcome::Completed { result_ref: None } => {
                    warn!(job = ?job.as_ref().map(JobId::as_str), "{}", NO_RESULT_WARNING);
                    inner.snapshot.state = ControllerState::Completed;
                    inner.snapshot.warning = Some(NO_RESULT_WARNING.to_string());
                    JobEventKind::CompletedWithoutResult
                }
                PollOutcome::Failed => {
                    error!(job = ?job.as_ref().map(JobId::as_str), "{}", ERROR_STATUS);
                    inner.snapshot.state = ControllerState::Failed;
                    inner.snapshot.error = Some(ERROR_STATUS.to_string());
                    JobEventKind::Failed
                }
                PollOutcome::Stopped => return,
            };
            inner.poll = None;
            self.publish(&inner);
            JobEvent::new(kind).with_job(job)
        };
        self.emit(event);
    }

    /// Stop polling synchronously and enter `Cancelling`.
    pub(crate) fn begin_cancel(&self) -> Result<CancelPlan, ControllerError> {
        let mut inner = self.lock();
        let state = inner.snapshot.state;
        if matches!(
            state,
            ControllerState::Cancelled | ControllerState::Cancelling
        ) {
            return Ok(CancelPlan::AlreadyCancelled);
        }
        if !state.can_cancel() {
            return Err(ControllerError::busy("cancel", state));
        }

        let poll = inner.poll.take().and_then(PollTask::stop);
        inner.pending = None;
        inner.snapshot.state = ControllerState::Cancelling;
        self.publish(&inner);
        Ok(CancelPlan::Proceed {
            run: inner.run,
            job: inner.snapshot.job.clone(),
            poll,
        })
    }

    pub(crate) fn finish_cancel(&self, run: u64, warning: Option<String>) -> bool {
        let mut inner = self.lock();
        if !inner.is(run, ControllerState::Cancelling) {
            return false;
        }
        inner.snapshot.state = ControllerState::Cancelled;
        inner.snapshot.warning = warning;
        self.publish(&inner);
        true
    }

    pub(crate) fn reset(&self) -> Result<(), ControllerError> {
        let mut inner = self.lock();
        let state = inner.snapshot.state;
        if !state.can_start() {
            return Err(ControllerError::busy("reset", state));
        }
        inner.run += 1;
        inner.snapshot = ControllerSnapshot::default();
        inner.pending = None;
        self.publish(&inner);
        Ok(())
    }

    /// Stop any poll loop for good; used on controller teardown.
    pub(crate) fn shutdown(&self) {
        let mut inner = self.lock();
        inner.run += 1;
        if let Some(handle) = inner.poll.take().and_then(PollTask::stop) {
            handle.abort();
        }
    }
}

/// [`PollSink`] binding a poll loop to one run of the controller.
pub(crate) struct RunSink {
    store: Arc<ControllerStore>,
    run: u64,
    job: JobId,
}

impl RunSink {
    pub(crate) fn new(store: Arc<ControllerStore>, run: u64, job: JobId) -> Self {
        Self { store, run, job }
    }
}

impl PollSink for RunSink {
    fn publish_logs(&self, logs: &[String]) -> bool {
        self.store.update_logs(self.run, logs)
    }

    fn poll_failed(&self, failures: u32, next: Duration, error: &ClientError) {
        self.store.emit(
            JobEvent::new(JobEventKind::PollFailed)
                .with_job(Some(self.job.clone()))
                .with_attempt(failures)
                .with_delay_ms(next.as_millis() as u64)
                .with_reason(error.to_string()),
        );
    }

    fn request_abandoned(&self, _seq: u64) {
        self.store.emit(
            JobEvent::new(JobEventKind::StaleResponseDiscarded).with_job(Some(self.job.clone())),
        );
    }
}
