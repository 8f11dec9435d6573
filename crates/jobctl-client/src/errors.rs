use thiserror::Error;

/// Failure of a single backend request.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// HTTP status code, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Request(e) => e.status().map(|s| s.as_u16()),
            TransportError::InvalidResponse(_) => None,
        }
    }
}

/// Error of a [`JobClient`](crate::JobClient) operation, tagged by the operation that failed.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("job submission failed: {0}")]
    Submission(#[source] TransportError),

    #[error("status poll failed: {0}")]
    Poll(#[source] TransportError),

    #[error("cancel request failed: {0}")]
    Cancel(#[source] TransportError),

    #[error("active job check failed: {0}")]
    ActiveCheck(#[source] TransportError),
}

impl ClientError {
    pub fn transport(&self) -> &TransportError {
        match self {
            ClientError::Submission(e)
            | ClientError::Poll(e)
            | ClientError::Cancel(e)
            | ClientError::ActiveCheck(e) => e,
        }
    }

    /// A cancel rejected because the backend has nothing to cancel (job unknown or already terminal).
    ///
    /// Callers treat this as a successful cancel.
    pub fn is_nothing_to_cancel(&self) -> bool {
        matches!(self, ClientError::Cancel(e) if matches!(e.status(), Some(404 | 409 | 410)))
    }
}

/// Invalid [`ClientConfig`](crate::ClientConfig) or HTTP client construction failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid client config: {0}")]
    Invalid(String),

    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}
