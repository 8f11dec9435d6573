use jobctl_core::Subscribe;
use jobctl_model::JobEvent;

use crate::subscriber::view::log_event;

/// Writes every controller event to the `tracing` log.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for Journal {
    fn on_event(&self, event: &JobEvent) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "journal"
    }
}
