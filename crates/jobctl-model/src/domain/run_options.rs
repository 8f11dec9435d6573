use serde::{Deserialize, Serialize};

use crate::DelayMs;

/// Per-run options forwarded verbatim into the submit request.
///
/// The controller never interprets these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// Ask the backend for additional debug information in the job log.
    #[serde(default)]
    pub verbose: bool,
    /// Delay between requests the job makes to its targets.
    #[serde(default)]
    pub delay_ms: DelayMs,
    /// Regenerate test cases instead of reusing cached ones.
    #[serde(default = "default_force")]
    pub force: bool,
}

fn default_force() -> bool {
    true
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            delay_ms: 0,
            force: default_force(),
        }
    }
}

impl RunOptions {
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: DelayMs) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}
