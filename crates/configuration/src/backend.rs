use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// The database technologies this workspace knows how to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Backend {
    /// Embedded, file-backed SQLite.
    Sqlite,
    /// Client/server PostgreSQL.
    Postgres,
}

/// Maps URI schemes to backends. Lookups are case-insensitive.
///
/// `postgresql+psycopg2` is accepted so URIs written for SQLAlchemy keep working.
pub const SCHEMES: &[(&str, Backend)] = &[
    ("sqlite", Backend::Sqlite),
    ("postgresql", Backend::Postgres),
    ("postgres", Backend::Postgres),
    ("postgresql+psycopg2", Backend::Postgres),
];

impl Backend {
    /// Looks up a backend by URI scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        SCHEMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(scheme))
            .map(|(_, backend)| *backend)
    }

    /// Detects the backend from the scheme portion of a URI.
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let (scheme, _) = uri
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidUri(format!("'{uri}' has no scheme")))?;
        Self::from_scheme(scheme).ok_or_else(|| ConfigError::UnsupportedBackend(scheme.to_string()))
    }

    /// The scheme used when rendering connection strings for this backend.
    pub fn scheme(self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgresql",
        }
    }

    /// Whether this backend talks to a server and therefore needs a host and credentials.
    pub fn is_client_server(self) -> bool {
        matches!(self, Backend::Postgres)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
        })
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_scheme(s).ok_or_else(|| ConfigError::UnsupportedBackend(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_lookup() {
        assert_eq!(Backend::from_scheme("sqlite"), Some(Backend::Sqlite));
        assert_eq!(Backend::from_scheme("PostgreSQL"), Some(Backend::Postgres));
        assert_eq!(Backend::from_scheme("postgresql+psycopg2"), Some(Backend::Postgres));
        assert_eq!(Backend::from_scheme("mysql"), None);
    }

    #[test]
    fn test_from_uri() {
        assert_eq!(Backend::from_uri("sqlite:///:memory:").unwrap(), Backend::Sqlite);
        assert_eq!(
            Backend::from_uri("postgres://app@db/app").unwrap(),
            Backend::Postgres
        );
        assert!(matches!(
            Backend::from_uri("unknown-scheme://host"),
            Err(ConfigError::UnsupportedBackend(s)) if s == "unknown-scheme"
        ));
        assert!(matches!(
            Backend::from_uri("no scheme here"),
            Err(ConfigError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_every_backend_has_a_scheme_entry() {
        for backend in [Backend::Sqlite, Backend::Postgres] {
            assert_eq!(Backend::from_scheme(backend.scheme()), Some(backend));
        }
    }
}
