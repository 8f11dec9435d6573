//! Prometheus metrics for the jobctl controller.
//!
//! [`PrometheusMetrics`] is a [`jobctl_core::Subscribe`] implementation: register it with the
//! controller and it turns controller events into counters.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use jobctl_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let subscriber: Arc<dyn jobctl_core::Subscribe> = Arc::new(metrics.clone());
//! // JobController::builder(client).with_subscriber(subscriber).build()?;
//! # let _ = subscriber;
//!
//! let text = metrics.render()?;
//! assert!(text.is_empty() || text.contains("jobctl_"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `jobctl_jobs_started_total` - Counter
//! - `jobctl_jobs_finished_total{outcome}` - Counter (`completed`, `completed_without_result`,
//!   `failed`, `cancelled`)
//! - `jobctl_poll_errors_total` - Counter
//! - `jobctl_conflicts_total{decision}` - Counter (`detected`, `abort`, `cancel_and_run`)
//!
//! ## HTTP Server
//! This crate does NOT serve `/metrics`. Use [`PrometheusMetrics::render`] from whatever HTTP
//! framework the application already runs.

mod backend;
pub use backend::{MetricsError, PrometheusMetrics};

pub use prometheus::{Encoder, Registry, TextEncoder};
