use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from file: {0}")]
    LoadError(#[from] config::ConfigError),

    /// The parameter set is ambiguous or incomplete.
    #[error("Invalid connection configuration: {0}")]
    Configuration(String),

    /// The URI scheme does not match any known backend.
    #[error("Unsupported database backend: '{0}'")]
    UnsupportedBackend(String),

    #[error("Malformed connection URI: {0}")]
    InvalidUri(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}
