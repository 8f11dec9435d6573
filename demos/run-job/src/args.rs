use std::path::PathBuf;

use clap::Parser;
use jobctl_model::ConflictDecision;
use jobctl_observe::LoggerFormat;

/// Submit one job to the backend and follow it to the end.
#[derive(Parser, Debug)]
#[command(name = "run-job")]
#[command(about = "Run a job on the remote backend and stream its logs", long_about = None)]
pub struct Args {
    /// Job configuration document (JSON, or any text forwarded as a string)
    pub config: PathBuf,

    /// Backend API base URL
    #[arg(long, env = "JOBCTL_BASE_URL", default_value = "http://localhost:15500/api")]
    pub base_url: String,

    /// What to do when another job is already running
    #[arg(long, env = "JOBCTL_ON_CONFLICT", default_value = "abort")]
    pub on_conflict: ConflictDecision,

    /// Ask the backend for verbose job output
    #[arg(short, long)]
    pub verbose: bool,

    /// Delay between backend requests made by the job, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Reuse previously generated artifacts instead of regenerating them
    #[arg(long = "no-force")]
    pub no_force: bool,

    /// Status poll interval in milliseconds
    #[arg(long, env = "JOBCTL_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "JOBCTL_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Log filter directive
    #[arg(long, env = "JOBCTL_LOG", default_value = "info")]
    pub log_level: String,

    /// Log output format (text|json|journald)
    #[arg(long, env = "JOBCTL_LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    pub metrics: bool,
}
