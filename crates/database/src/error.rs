use configuration::error::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid connection configuration: {0}")]
    ConfigurationError(String),

    #[error("Unsupported database backend: '{0}'")]
    UnsupportedBackendError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[source] sqlx::Error),

    #[error("Schema operation on table '{table}' failed: {source}")]
    SchemaError {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Invalid schema definition: {0}")]
    InvalidSchema(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Table '{0}' is not registered in the schema.")]
    UnknownTable(String),

    #[error("The database is unusable after a failed schema operation.")]
    Failed,
}

impl From<ConfigError> for DbError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnsupportedBackend(scheme) => DbError::UnsupportedBackendError(scheme),
            other => DbError::ConfigurationError(other.to_string()),
        }
    }
}
