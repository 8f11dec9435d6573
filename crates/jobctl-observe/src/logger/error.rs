use thiserror::Error;
use tracing_subscriber::util::TryInitError;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format `{0}` (expected text, json or journald)")]
    UnknownFormat(String),

    #[error("journald output needs linux and the `journald` feature")]
    JournaldUnavailable,

    #[error("cannot open the journald socket: {0}")]
    Journald(#[source] std::io::Error),

    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter { directive: String, reason: String },

    /// A global `tracing` subscriber was installed before `logger_init` ran.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("failed to install the tracing subscriber: {0}")]
    Install(#[source] TryInitError),
}
