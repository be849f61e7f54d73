use crate::backends;
use crate::error::DbError;
use configuration::{ConnectionConfig, ConnectionTarget};
use sqlx::AnyPool;
use sqlx::any::AnyConnectOptions;
use sqlx::ConnectOptions;
use std::str::FromStr;

/// Establishes the engine handle (a connection pool) for a resolved target.
///
/// The pool eagerly opens one connection, so an unreachable server or rejected
/// credentials surface here as [`DbError::ConnectionError`]. When `echo` is set,
/// every statement is logged by sqlx under the `sqlx::query` target; otherwise
/// statement logging is switched off entirely.
pub async fn connect(target: &ConnectionTarget, config: &ConnectionConfig) -> Result<AnyPool, DbError> {
    sqlx::any::install_default_drivers();

    let url = backends::driver_url(target);
    let options = AnyConnectOptions::from_str(&url).map_err(|e| {
        DbError::ConfigurationError(format!("driver rejected '{}': {e}", target.redacted()))
    })?;
    let options = if config.echo {
        options
    } else {
        options.disable_statement_logging()
    };

    let pool = backends::pool_options(target, config)
        .connect_with(options)
        .await
        .map_err(DbError::ConnectionError)?;

    Ok(pool)
}
