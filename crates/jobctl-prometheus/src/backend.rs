use jobctl_core::Subscribe;
use jobctl_model::{JobEvent, JobEventKind};
use prometheus::proto::MetricFamily;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Controller counters backed by their own [`Registry`].
///
/// Clones share the registry and the counters.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    started: IntCounter,
    finished: IntCounterVec,
    poll_errors: IntCounter,
    conflicts: IntCounterVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_registry(Registry::new())
    }

    /// Register the counters in an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, MetricsError> {
        let started = IntCounter::with_opts(Opts::new(
            "jobctl_jobs_started_total",
            "Jobs accepted by the backend",
        ))?;
        let finished = IntCounterVec::new(
            Opts::new(
                "jobctl_jobs_finished_total",
                "Jobs that reached a terminal state, by outcome",
            ),
            &["outcome"],
        )?;
        let poll_errors = IntCounter::with_opts(Opts::new(
            "jobctl_poll_errors_total",
            "Failed status requests",
        ))?;
        let conflicts = IntCounterVec::new(
            Opts::new(
                "jobctl_conflicts_total",
                "Run slot conflicts, by decision",
            ),
            &["decision"],
        )?;

        registry.register(Box::new(started.clone()))?;
        registry.register(Box::new(finished.clone()))?;
        registry.register(Box::new(poll_errors.clone()))?;
        registry.register(Box::new(conflicts.clone()))?;

        Ok(Self {
            registry,
            started,
            finished,
            poll_errors,
            conflicts,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, MetricsError> {
        Ok(TextEncoder::new().encode_to_string(&self.gather())?)
    }

    fn record(&self, kind: JobEventKind) {
        match kind {
            JobEventKind::Submitted => self.started.inc(),
            JobEventKind::PollFailed => self.poll_errors.inc(),

            JobEventKind::Completed => self.finished.with_label_values(&["completed"]).inc(),
            JobEventKind::CompletedWithoutResult => self
                .finished
                .with_label_values(&["completed_without_result"])
                .inc(),
            JobEventKind::Failed | JobEventKind::SubmitFailed => {
                self.finished.with_label_values(&["failed"]).inc()
            }
            JobEventKind::Cancelled => self.finished.with_label_values(&["cancelled"]).inc(),

            JobEventKind::ConflictDetected => {
                self.conflicts.with_label_values(&["detected"]).inc()
            }
            JobEventKind::ConflictAborted => self.conflicts.with_label_values(&["abort"]).inc(),
            JobEventKind::ExistingJobCancelled => {
                self.conflicts.with_label_values(&["cancel_and_run"]).inc()
            }

            _ => {}
        }
    }
}

impl Subscribe for PrometheusMetrics {
    fn on_event(&self, event: &JobEvent) {
        self.record(event.kind);
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}
