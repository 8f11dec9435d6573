//! Request and response bodies of the backend HTTP API.

use jobctl_model::{ActiveJobCheck, JobId, JobPayload, JobState, JobStatus, RunOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct SubmitBody<'a> {
    config: &'a JobPayload,
    force: bool,
    verbose: bool,
    delay: u64,
}

impl<'a> SubmitBody<'a> {
    pub(crate) fn new(config: &'a JobPayload, options: &RunOptions) -> Self {
        Self {
            config,
            force: options.force,
            verbose: options.verbose,
            delay: options.delay_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitReply {
    #[serde(alias = "jobId")]
    pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusReply {
    status: JobState,
    #[serde(default)]
    logs: Option<Vec<String>>,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    eval_id: Option<String>,
    #[serde(default)]
    result_ref: Option<String>,
}

impl From<StatusReply> for JobStatus {
    fn from(reply: StatusReply) -> Self {
        // A complete job only counts as having a result when the backend attached one.
        let has_result = reply.result.as_ref().is_some_and(|v| !v.is_null());
        let result_ref = match reply.status {
            JobState::Complete if has_result => reply.eval_id,
            JobState::Complete => reply.result_ref,
            _ => None,
        };

        JobStatus {
            state: reply.status,
            logs: reply.logs.unwrap_or_default(),
            result_ref,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActiveReply {
    has_running_job: bool,
    #[serde(default)]
    job_id: Option<String>,
}

impl From<ActiveReply> for ActiveJobCheck {
    fn from(reply: ActiveReply) -> Self {
        ActiveJobCheck {
            active: reply.has_running_job,
            job: reply.job_id.map(JobId::from),
        }
    }
}
