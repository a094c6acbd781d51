//! Tracing setup for the service and the CLI.

use thiserror::Error;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

/// Dependencies whose request-level chatter is capped unless asked for.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "h2=warn", "tower=warn"];

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{value}': {source}")]
    EnvFilter { value: String, source: ParseError },
    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(config.ansi)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// Filter for a configured level such as `info` or `closing_docs=debug`.
/// Noisy dependencies stay at `warn` unless the level names them.
pub fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    let invalid = |source| TelemetryError::EnvFilter {
        value: level.to_string(),
        source,
    };

    let mut filter = EnvFilter::try_new(level).map_err(invalid)?;
    for quiet in QUIET_TARGETS {
        let target = quiet.split('=').next().unwrap_or_default();
        if level.contains(target) {
            continue;
        }
        let directive: Directive = quiet.parse().map_err(invalid)?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}
