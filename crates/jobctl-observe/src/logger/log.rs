use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::{Subscriber, dispatcher};
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::time::OffsetTime, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

/// Build the filter and the output layer for `cfg` and install them globally.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    if dispatcher::has_been_set() {
        return Err(LoggerError::AlreadyInitialized);
    }
    let registry = tracing_subscriber::registry().with(filter(&cfg.level)?);

    let installed = match cfg.format {
        LoggerFormat::Text => registry.with(text_layer(cfg)).try_init(),
        LoggerFormat::Json => registry.with(json_layer(cfg)).try_init(),
        #[cfg(all(target_os = "linux", feature = "journald"))]
        LoggerFormat::Journald => registry.with(journald_layer()?).try_init(),
        #[cfg(not(all(target_os = "linux", feature = "journald")))]
        LoggerFormat::Journald => return Err(LoggerError::JournaldUnavailable),
    };
    installed.map_err(LoggerError::Install)
}

fn filter(directive: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directive).map_err(|e| LoggerError::InvalidFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// RFC 3339 timestamps in the local offset, UTC when the offset cannot be determined.
fn timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn text_layer<S>(cfg: &LoggerConfig) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(cfg.use_color)
        .with_target(cfg.with_targets)
        .with_timer(timer())
}

/// One JSON object per line; event fields sit at the top level next to the current span.
fn json_layer<S>(cfg: &LoggerConfig) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_timer(timer())
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer() -> Result<tracing_journald::Layer, LoggerError> {
    tracing_journald::layer()
        .map(|layer| layer.with_syslog_identifier("jobctl".to_string()))
        .map_err(LoggerError::Journald)
}
