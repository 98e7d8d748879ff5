//! Tracing setup shared by the dashboard binaries.
//!
//! `RUST_LOG` wins when set; otherwise the configured level is used with
//! the HTTP stack's per-connection chatter turned down.

use crate::config::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level '{value}'")]
    InvalidLevel {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("tracing subscriber already installed: {0}")]
    Install(Box<dyn std::error::Error + Send + Sync>),
}

fn filter_from_level(level: &str) -> Result<EnvFilter, TelemetryError> {
    let directives = format!("{level},hyper=warn,tower=warn");
    EnvFilter::try_new(directives).map_err(|source| TelemetryError::InvalidLevel {
        value: level.to_string(),
        source,
    })
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_from_level(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Install)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_levels_build_a_filter() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(filter_from_level(level).is_ok(), "level '{level}' rejected");
        }
    }

    #[test]
    fn garbage_level_is_rejected() {
        let err = filter_from_level("!!not-a-level[").expect_err("garbage rejected");
        assert!(matches!(err, TelemetryError::InvalidLevel { .. }));
    }
}
