use crate::backend::Backend;
use crate::error::ConfigError;
use crate::uri::{
    ConnectionTarget, DEFAULT_POSTGRES_PORT, PostgresParams, SQLITE_MEMORY, SqliteLocation, SqliteParams,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default upper bound on pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a pooled connection, in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Parameters describing how to reach a database.
///
/// Either `uri` is set, or the discrete fields (`hostname`, `port`, `username`,
/// `password`, `database`) are. Mixing the two is rejected by [`ConnectionConfig::resolve`].
/// For SQLite, `database` holds the file path (or `:memory:`).
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct ConnectionConfig {
    /// Explicit backend, used when only discrete parameters are given.
    #[cfg_attr(feature = "clap", arg(long = "db-backend", value_enum))]
    pub backend: Option<Backend>,
    /// Full RFC 3986 connection URI; its scheme selects the backend.
    #[cfg_attr(feature = "clap", arg(long = "db-uri"))]
    pub uri: Option<String>,
    #[cfg_attr(feature = "clap", arg(long = "db-host"))]
    pub hostname: Option<String>,
    #[cfg_attr(feature = "clap", arg(long = "db-port"))]
    pub port: Option<u16>,
    #[cfg_attr(feature = "clap", arg(long = "db-user"))]
    pub username: Option<String>,
    #[cfg_attr(feature = "clap", arg(long = "db-password"))]
    pub password: Option<String>,
    /// Database name, or file path for SQLite.
    #[cfg_attr(feature = "clap", arg(long = "db-name"))]
    pub database: Option<String>,
    /// Log every statement issued through the engine.
    #[cfg_attr(feature = "clap", arg(long = "db-echo"))]
    pub echo: bool,
    /// Drop and recreate all registered tables right after connecting.
    #[cfg_attr(feature = "clap", arg(long = "db-reinitialize"))]
    pub reinitialize: bool,
    #[cfg_attr(feature = "clap", arg(long = "db-max-connections", default_value_t = DEFAULT_MAX_CONNECTIONS))]
    pub max_connections: u32,
    #[cfg_attr(feature = "clap", arg(long = "db-acquire-timeout", default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS))]
    pub acquire_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            backend: None,
            uri: None,
            hostname: None,
            port: None,
            username: None,
            password: None,
            database: None,
            echo: false,
            reinitialize: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

// Passwords never reach logs through `{:?}`.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("backend", &self.backend)
            .field("uri", &self.uri.as_ref().map(|_| self.redacted()))
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("echo", &self.echo)
            .field("reinitialize", &self.reinitialize)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl ConnectionConfig {
    /// A configuration that connects through a single URI.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// An SQLite database stored at `path`.
    pub fn sqlite(path: impl AsRef<Path>) -> Self {
        Self {
            backend: Some(Backend::Sqlite),
            database: Some(path.as_ref().to_string_lossy().into_owned()),
            ..Self::default()
        }
    }

    /// A private in-memory SQLite database.
    pub fn sqlite_in_memory() -> Self {
        Self::sqlite(SQLITE_MEMORY)
    }

    /// A PostgreSQL database. A `hostname` of `None` selects the Unix domain socket.
    pub fn postgres(
        hostname: Option<&str>,
        port: Option<u16>,
        username: &str,
        password: Option<&str>,
        database: &str,
    ) -> Self {
        Self {
            backend: Some(Backend::Postgres),
            hostname: hostname.map(str::to_string),
            port,
            username: Some(username.to_string()),
            password: password.map(str::to_string),
            database: Some(database.to_string()),
            ..Self::default()
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_reinitialize(mut self, reinitialize: bool) -> Self {
        self.reinitialize = reinitialize;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_secs = timeout.as_secs();
        self
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Whether any of the discrete connection fields is populated.
    pub fn has_discrete_params(&self) -> bool {
        self.hostname.is_some()
            || self.port.is_some()
            || self.username.is_some()
            || self.password.is_some()
            || self.database.is_some()
    }

    /// Validates the parameter set and resolves it to a backend-specific target.
    pub fn resolve(&self) -> Result<ConnectionTarget, ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }

        match (&self.uri, self.has_discrete_params()) {
            (Some(_), true) => Err(ConfigError::Configuration(
                "specify either a URI or discrete connection parameters, not both".to_string(),
            )),
            (None, false) => Err(ConfigError::Configuration(
                "no URI or connection parameters were supplied".to_string(),
            )),
            (Some(uri), false) => {
                let target = ConnectionTarget::parse(uri)?;
                match self.backend {
                    Some(hint) if hint != target.backend() => Err(ConfigError::Configuration(
                        format!("backend '{hint}' does not match URI scheme of '{}'", target.redacted()),
                    )),
                    _ => Ok(target),
                }
            }
            (None, true) => self.resolve_discrete(),
        }
    }

    fn resolve_discrete(&self) -> Result<ConnectionTarget, ConfigError> {
        let backend = self.backend.unwrap_or(
            if self.hostname.is_some()
                || self.port.is_some()
                || self.username.is_some()
                || self.password.is_some()
            {
                Backend::Postgres
            } else {
                Backend::Sqlite
            },
        );

        match backend {
            Backend::Sqlite => {
                let stray: Vec<&str> = [
                    ("hostname", self.hostname.is_some()),
                    ("port", self.port.is_some()),
                    ("username", self.username.is_some()),
                    ("password", self.password.is_some()),
                ]
                .into_iter()
                .filter_map(|(name, set)| set.then_some(name))
                .collect();
                if !stray.is_empty() {
                    return Err(ConfigError::Configuration(format!(
                        "sqlite does not accept {}",
                        stray.join(", ")
                    )));
                }
                let path = self.database.as_deref().ok_or_else(|| {
                    ConfigError::Configuration("sqlite requires a database path".to_string())
                })?;
                SqliteLocation::from_path(path)
                    .map(|location| ConnectionTarget::Sqlite(SqliteParams::new(location)))
            }
            Backend::Postgres => {
                let username = required(&self.username, "username")?;
                let database = required(&self.database, "database")?;
                Ok(ConnectionTarget::Postgres(PostgresParams {
                    hostname: self.hostname.clone().filter(|h| !h.is_empty()),
                    port: self.port.unwrap_or(DEFAULT_POSTGRES_PORT),
                    username,
                    password: self.password.clone(),
                    database,
                    options: Vec::new(),
                }))
            }
        }
    }

    /// The fully-formed connection string.
    pub fn render(&self) -> Result<String, ConfigError> {
        Ok(self.resolve()?.render())
    }

    /// The connection string with the password masked. Falls back to a placeholder
    /// when the configuration does not resolve.
    pub fn redacted(&self) -> String {
        self.resolve()
            .map(|target| target.redacted())
            .unwrap_or_else(|_| "<invalid connection configuration>".to_string())
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String, ConfigError> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::Configuration(format!("postgres requires a {name}")))
}

impl From<&str> for ConnectionConfig {
    fn from(uri: &str) -> Self {
        Self::from_uri(uri)
    }
}

impl From<String> for ConnectionConfig {
    fn from(uri: String) -> Self {
        Self::from_uri(uri)
    }
}
