use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller's answer when another job already holds the backend run slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictDecision {
    /// Leave the running job alone and submit nothing.
    Abort,
    /// Cancel the running job, wait for the backend to settle, then submit.
    CancelAndRun,
}

impl ConflictDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictDecision::Abort => "abort",
            ConflictDecision::CancelAndRun => "cancel-and-run",
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid conflict decision: {0} (expected: abort|cancel-and-run)")]
pub struct ParseDecisionError(String);

impl FromStr for ConflictDecision {
    type Err = ParseDecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(ConflictDecision::Abort),
            "cancel-and-run" | "cancel_and_run" => Ok(ConflictDecision::CancelAndRun),
            _ => Err(ParseDecisionError(s.to_string())),
        }
    }
}
