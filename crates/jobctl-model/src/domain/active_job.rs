use serde::{Deserialize, Serialize};

use crate::JobId;

/// Answer to "is any job running on the backend right now".
///
/// The backend owns a single global run slot shared by every client, so `active` may be `true`
/// for a job this client never submitted. `job` is set only when the backend discloses the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveJobCheck {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
}

impl ActiveJobCheck {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(job: Option<JobId>) -> Self {
        Self { active: true, job }
    }
}
