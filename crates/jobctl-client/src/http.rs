use std::time::Duration;

use async_trait::async_trait;
use jobctl_model::{ActiveJobCheck, JobId, JobPayload, JobStatus, RunOptions};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::client::JobClient;
use crate::config::ClientConfig;
use crate::errors::{ClientError, ConfigError, TransportError};
use crate::wire::{ActiveReply, StatusReply, SubmitBody, SubmitReply};

/// [`JobClient`] speaking JSON over HTTP to the evaluation backend.
#[derive(Debug, Clone)]
pub struct HttpJobClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpJobClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl JobClient for HttpJobClient {
    async fn submit(
        &self,
        payload: &JobPayload,
        options: &RunOptions,
    ) -> Result<JobId, ClientError> {
        let url = self.config.url(&self.config.routes.submit);
        debug!(%url, verbose = options.verbose, delay_ms = options.delay_ms, "submitting job");

        let run = async {
            let response = self
                .http
                .post(&url)
                .json(&SubmitBody::new(payload, options))
                .send()
                .await?;
            read_json::<SubmitReply>(response).await
        };
        let reply = run.await.map_err(ClientError::Submission)?;

        if reply.id.trim().is_empty() {
            return Err(ClientError::Submission(TransportError::InvalidResponse(
                "backend returned an empty job id".into(),
            )));
        }
        Ok(JobId::from(reply.id))
    }

    async fn fetch_status(&self, job: &JobId) -> Result<JobStatus, ClientError> {
        let url = self.config.url(&self.config.routes.status_for(job.as_str()));
        trace!(%url, "fetching job status");

        let run = async {
            let response = self.http.get(&url).send().await?;
            read_json::<StatusReply>(response).await
        };
        run.await.map(JobStatus::from).map_err(ClientError::Poll)
    }

    async fn cancel(&self, job: Option<&JobId>) -> Result<(), ClientError> {
        let url = self.config.url(&self.config.routes.cancel);
        debug!(%url, job = ?job.map(JobId::as_str), "sending cancel request");

        let run = async {
            let response = self.http.post(&url).send().await?;
            ensure_success(response).await.map(|_| ())
        };
        run.await.map_err(ClientError::Cancel)
    }

    async fn check_active_job(&self) -> Result<ActiveJobCheck, ClientError> {
        let url = self.config.url(&self.config.routes.active);
        trace!(%url, "checking for a running job");

        let run = async {
            let response = self.http.get(&url).send().await?;
            read_json::<ActiveReply>(response).await
        };
        run.await.map(ActiveJobCheck::from).map_err(ClientError::ActiveCheck)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read response body".to_string());
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TransportError> {
    let body = ensure_success(response).await?.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        TransportError::InvalidResponse(format!("failed to parse response: {}, body: {}", e, body))
    })
}
