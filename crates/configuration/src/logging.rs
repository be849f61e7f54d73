//! Tracing subscriber setup shared by binaries and integration tests.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where and how verbosely to log.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `dbkit=debug,sqlx::query=info`.
    /// When unset, `RUST_LOG` is used, falling back to `info`.
    pub filter: Option<String>,
    /// Write to `<directory>/<file_name>` instead of stdout.
    pub directory: Option<PathBuf>,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            directory: None,
            file_name: "dbkit.log".to_string(),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Returns the appender guard when logging to a file; dropping it flushes and
/// stops the background writer, so hold it for the life of the program.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = match &config.filter {
        Some(directive) => {
            EnvFilter::try_new(directive).map_err(|e| ConfigError::Logging(e.to_string()))?
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::never(directory, &config.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            FmtSubscriber::builder()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_reported() {
        let config = LoggingConfig {
            filter: Some("dbkit=notalevel".to_string()),
            ..LoggingConfig::default()
        };
        assert!(matches!(init_logging(&config), Err(ConfigError::Logging(_))));
    }
}
