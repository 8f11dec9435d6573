use serde::{Deserialize, Serialize};

/// Job configuration document.
///
/// Produced by an external configuration builder and passed to the backend untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobPayload(pub serde_json::Value);

impl JobPayload {
    pub fn new(document: serde_json::Value) -> Self {
        Self(document)
    }

    pub fn document(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for JobPayload {
    fn from(document: serde_json::Value) -> Self {
        Self(document)
    }
}
