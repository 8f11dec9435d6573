use std::borrow::Borrow;

use jobctl_model::{JobEvent, JobEventKind};
use tracing::{debug, error, info, trace, warn};

pub trait View {
    fn as_job(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn attempt(&self) -> u32;
    fn delay_ms(&self) -> u64;
    fn kind(&self) -> JobEventKind;
    fn has_reason(&self) -> bool;
}

impl<T> View for T
where
    T: Borrow<JobEvent>,
{
    #[inline]
    fn as_job(&self) -> &str {
        self.borrow().job.as_ref().map_or("unknown", |j| j.as_str())
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn attempt(&self) -> u32 {
        self.borrow().attempt.unwrap_or(0)
    }
    #[inline]
    fn delay_ms(&self) -> u64 {
        self.borrow().delay_ms.unwrap_or(0)
    }
    #[inline]
    fn kind(&self) -> JobEventKind {
        self.borrow().kind
    }
    #[inline]
    fn has_reason(&self) -> bool {
        self.borrow().reason.is_some()
    }
}

#[inline]
pub fn message_for(kind: JobEventKind) -> &'static str {
    match kind {
        // start
        JobEventKind::StartRequested => "start requested",
        JobEventKind::ActiveCheckFailed => "active job check failed; assuming no running job",
        JobEventKind::ConflictDetected => "another job is running; waiting for a decision",
        JobEventKind::ConflictAborted => "conflict aborted; running job left alone",
        JobEventKind::ExistingJobCancelled => "running job cancelled to make room",
        JobEventKind::Submitted => "job submitted",
        JobEventKind::SubmitFailed => "job submission failed",

        // polling
        JobEventKind::PollFailed => "status request failed; polling continues",
        JobEventKind::StaleResponseDiscarded => "status request superseded by a newer tick",

        // terminal
        JobEventKind::Completed => "job completed",
        JobEventKind::CompletedWithoutResult => "job completed without a result",
        JobEventKind::Failed => "job failed",

        // cancel
        JobEventKind::CancelRequested => "cancel requested",
        JobEventKind::CancelFailed => "cancel request failed",
        JobEventKind::Cancelled => "job cancelled",

        JobEventKind::Reset => "controller reset",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // start
        JobEventKind::StartRequested => debug!("{msg}"),
        JobEventKind::ActiveCheckFailed => warn!(reason = e.as_reason(), "{msg}"),
        JobEventKind::ConflictDetected => info!(job = e.as_job(), "{msg}"),
        JobEventKind::ConflictAborted => info!("{msg}"),
        JobEventKind::ExistingJobCancelled => info!(job = e.as_job(), "{msg}"),
        JobEventKind::Submitted => info!(job = e.as_job(), "{msg}"),
        JobEventKind::SubmitFailed => error!(reason = e.as_reason(), "{msg}"),

        // polling
        JobEventKind::PollFailed => warn!(
            job = e.as_job(),
            attempt = e.attempt(),
            delay_ms = e.delay_ms(),
            reason = e.as_reason(),
            "{msg}"
        ),
        JobEventKind::StaleResponseDiscarded => trace!(job = e.as_job(), "{msg}"),

        // terminal
        JobEventKind::Completed => info!(job = e.as_job(), "{msg}"),
        JobEventKind::CompletedWithoutResult => warn!(job = e.as_job(), "{msg}"),
        JobEventKind::Failed => {
            if e.has_reason() {
                error!(job = e.as_job(), reason = e.as_reason(), "{msg}")
            } else {
                error!(job = e.as_job(), "{msg}")
            }
        }

        // cancel
        JobEventKind::CancelRequested => debug!(job = e.as_job(), "{msg}"),
        JobEventKind::CancelFailed => {
            warn!(job = e.as_job(), reason = e.as_reason(), "{msg}")
        }
        JobEventKind::Cancelled => info!(job = e.as_job(), "{msg}"),

        JobEventKind::Reset => trace!("{msg}"),
    }
}
