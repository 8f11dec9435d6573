use crate::errors::ConfigError;

const DEFAULT_BASE_URL: &str = "http://localhost:15500/api";
const ID_PLACEHOLDER: &str = "{id}";

/// Backend paths, relative to [`ClientConfig::base_url`].
#[derive(Debug, Clone)]
pub struct Routes {
    /// POST, creates a job.
    pub submit: String,
    /// GET, job status. Must contain `{id}`.
    pub status: String,
    /// POST, cancels the active job.
    pub cancel: String,
    /// GET, reports whether any job is running.
    pub active: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            submit: "/redteam/run".to_string(),
            status: "/eval/job/{id}".to_string(),
            cancel: "/redteam/cancel".to_string(),
            active: "/redteam/status".to_string(),
        }
    }
}

impl Routes {
    pub(crate) fn status_for(&self, id: &str) -> String {
        self.status.replace(ID_PLACEHOLDER, id)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Upper bound for a single request, including reading the body.
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub routes: Routes,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            routes: Routes::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    pub fn with_routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be > 0".into()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid("connect_timeout_ms must be > 0".into()));
        }
        if !self.routes.status.contains(ID_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "status route must contain {ID_PLACEHOLDER}, got '{}'",
                self.routes.status
            )));
        }
        Ok(())
    }

    /// Join `path` onto the base url, tolerating a trailing slash on either side.
    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
