//! Backend variants.
//!
//! Each backend module knows how to turn a resolved [`ConnectionTarget`] into a
//! driver URL, how to tune the connection pool for that technology, and how to
//! list the tables that exist. Dispatch is an exhaustive `match` on the target,
//! so adding a backend means adding a [`configuration::Backend`] variant, its
//! scheme-table entry, and a module here.

pub mod postgres;
pub mod sqlite;

use configuration::{ConnectionConfig, ConnectionTarget};
use sqlx::any::AnyPoolOptions;

pub use postgres::PostgresDatabase;
pub use sqlite::SqliteDatabase;

/// URL understood by the sqlx driver for this target.
pub(crate) fn driver_url(target: &ConnectionTarget) -> String {
    match target {
        ConnectionTarget::Sqlite(params) => sqlite::driver_url(params),
        ConnectionTarget::Postgres(params) => postgres::driver_url(params),
    }
}

/// Pool settings from the configuration, adjusted per backend.
pub(crate) fn pool_options(target: &ConnectionTarget, config: &ConnectionConfig) -> AnyPoolOptions {
    let options = AnyPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout());

    match target {
        ConnectionTarget::Sqlite(params) => sqlite::pool_options(&params.location, options),
        ConnectionTarget::Postgres(_) => options,
    }
}

/// Query returning the names of user tables, one text column per row.
pub(crate) fn list_tables_sql(target: &ConnectionTarget) -> &'static str {
    match target {
        ConnectionTarget::Sqlite(_) => sqlite::LIST_TABLES,
        ConnectionTarget::Postgres(_) => postgres::LIST_TABLES,
    }
}
