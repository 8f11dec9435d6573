use jobctl_model::JobEvent;

/// Receiver of controller events.
///
/// Called synchronously on the task that produced the event, never while controller locks are held.
/// Implementations should return quickly.
pub trait Subscribe: Send + Sync {
    fn on_event(&self, event: &JobEvent);

    fn name(&self) -> &'static str;
}
