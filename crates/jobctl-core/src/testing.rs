//! Scripted collaborators for controller tests.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobctl_client::{ClientError, JobClient, TransportError};
use jobctl_model::{
    ActiveJobCheck, JobEvent, JobEventKind, JobId, JobPayload, JobState, JobStatus, RunOptions,
};
use tokio::time::Instant;

use crate::polling::PollSink;
use crate::subscriber::Subscribe;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CheckActive,
    Submit(RunOptions),
    Fetch(JobId),
    Cancel(Option<JobId>),
}

/// Scripted reply to a status request.
pub(crate) enum Step {
    Status(JobStatus),
    Fail,
    Hang,
}

/// [`JobClient`] answering from per-operation scripts.
///
/// An exhausted script falls back to: not active, submit `job-1`, status `running` with no logs,
/// cancel accepted.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    statuses: Mutex<VecDeque<Step>>,
    active: Mutex<VecDeque<Result<ActiveJobCheck, ClientError>>>,
    submits: Mutex<VecDeque<Result<JobId, ClientError>>>,
    cancels: Mutex<VecDeque<Result<(), ClientError>>>,
    submit_delay: Mutex<Duration>,
    cancel_delay: Mutex<Duration>,
    calls: Mutex<Vec<(Instant, Call)>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_status(&self, step: Step) {
        self.statuses.lock().unwrap().push_back(step);
    }

    pub(crate) fn push_active(&self, reply: Result<ActiveJobCheck, ClientError>) {
        self.active.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_submit(&self, reply: Result<JobId, ClientError>) {
        self.submits.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_cancel(&self, reply: Result<(), ClientError>) {
        self.cancels.lock().unwrap().push_back(reply);
    }

    pub(crate) fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = delay;
    }

    pub(crate) fn set_cancel_delay(&self, delay: Duration) {
        *self.cancel_delay.lock().unwrap() = delay;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls_at().into_iter().map(|(_, call)| call).collect()
    }

    pub(crate) fn calls_at(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn fetches(&self) -> usize {
        self.count(|c| matches!(c, Call::Fetch(_)))
    }

    pub(crate) fn cancels(&self) -> usize {
        self.count(|c| matches!(c, Call::Cancel(_)))
    }

    pub(crate) fn submits(&self) -> usize {
        self.count(|c| matches!(c, Call::Submit(_)))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, c)| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

#[async_trait]
impl JobClient for ScriptedClient {
    async fn submit(
        &self,
        _payload: &JobPayload,
        options: &RunOptions,
    ) -> Result<JobId, ClientError> {
        self.record(Call::Submit(options.clone()));
        let delay = *self.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let reply = self.submits.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(JobId::from("job-1")))
    }

    async fn fetch_status(&self, job: &JobId) -> Result<JobStatus, ClientError> {
        self.record(Call::Fetch(job.clone()));
        let step = self.statuses.lock().unwrap().pop_front();
        match step {
            Some(Step::Status(status)) => Ok(status),
            Some(Step::Fail) => Err(poll_error()),
            Some(Step::Hang) => pending().await,
            None => Ok(JobStatus::new(JobState::Running)),
        }
    }

    async fn cancel(&self, job: Option<&JobId>) -> Result<(), ClientError> {
        self.record(Call::Cancel(job.cloned()));
        let delay = *self.cancel_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let reply = self.cancels.lock().unwrap().pop_front();
        reply.unwrap_or(Ok(()))
    }

    async fn check_active_job(&self) -> Result<ActiveJobCheck, ClientError> {
        self.record(Call::CheckActive);
        let reply = self.active.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(ActiveJobCheck::idle()))
    }
}

fn unavailable() -> TransportError {
    TransportError::Status {
        status: 503,
        body: "service unavailable".into(),
    }
}

pub(crate) fn poll_error() -> ClientError {
    ClientError::Poll(unavailable())
}

pub(crate) fn cancel_error() -> ClientError {
    ClientError::Cancel(unavailable())
}

pub(crate) fn submit_error() -> ClientError {
    ClientError::Submission(TransportError::Status {
        status: 422,
        body: "invalid config".into(),
    })
}

pub(crate) fn active_error() -> ClientError {
    ClientError::ActiveCheck(unavailable())
}

pub(crate) fn running(logs: &[&str]) -> JobStatus {
    JobStatus::new(JobState::Running).with_logs(logs.iter().copied())
}

pub(crate) fn complete(logs: &[&str], result_ref: Option<&str>) -> JobStatus {
    let status = JobStatus::new(JobState::Complete).with_logs(logs.iter().copied());
    match result_ref {
        Some(r) => status.with_result_ref(r),
        None => status,
    }
}

pub(crate) fn errored(logs: &[&str]) -> JobStatus {
    JobStatus::new(JobState::Error).with_logs(logs.iter().copied())
}

/// [`PollSink`] keeping everything it is told.
pub(crate) struct RecordingSink {
    published: Mutex<Vec<Vec<String>>>,
    failures: Mutex<Vec<u32>>,
    abandoned: Mutex<Vec<u64>>,
    detached: AtomicBool,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            abandoned: Mutex::new(Vec::new()),
            detached: AtomicBool::new(false),
        })
    }

    pub(crate) fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    pub(crate) fn published(&self) -> Vec<Vec<String>> {
        self.published.lock().unwrap().clone()
    }

    pub(crate) fn last_logs(&self) -> Vec<String> {
        self.published().last().cloned().unwrap_or_default()
    }

    pub(crate) fn failures(&self) -> Vec<u32> {
        self.failures.lock().unwrap().clone()
    }

    pub(crate) fn abandoned(&self) -> Vec<u64> {
        self.abandoned.lock().unwrap().clone()
    }
}

impl PollSink for Arc<RecordingSink> {
    fn publish_logs(&self, logs: &[String]) -> bool {
        self.published.lock().unwrap().push(logs.to_vec());
        !self.detached.load(Ordering::SeqCst)
    }

    fn poll_failed(&self, failures: u32, _next: Duration, _error: &ClientError) {
        self.failures.lock().unwrap().push(failures);
    }

    fn request_abandoned(&self, seq: u64) {
        self.abandoned.lock().unwrap().push(seq);
    }
}

/// [`Subscribe`] keeping event kinds in arrival order.
#[derive(Default)]
pub(crate) struct RecordingSubscriber {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingSubscriber {
    pub(crate) fn kinds(&self) -> Vec<JobEventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub(crate) fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Subscribe for RecordingSubscriber {
    fn on_event(&self, event: &JobEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
