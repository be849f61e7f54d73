//! Embedded, file-backed SQLite.

use crate::database::Database;
use crate::error::DbError;
use crate::schema::Schema;
use configuration::{ConnectionConfig, SqliteLocation, SqliteParams, render_query};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sqlx::Executor;
use sqlx::any::AnyPoolOptions;
use std::path::Path;

pub(crate) const LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

/// The driver percent-decodes the file name, so these must be escaped.
const FILE_NAME: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'?').add(b'#');

pub(crate) fn driver_url(params: &SqliteParams) -> String {
    match &params.location {
        SqliteLocation::Memory => format!("sqlite::memory:{}", render_query(&params.options)),
        SqliteLocation::File(path) => {
            let path = path.to_string_lossy();
            // mode=rwc creates the file on first use unless the caller picked a mode.
            let mut options = params.options.clone();
            if !options.iter().any(|(key, _)| key == "mode") {
                options.insert(0, ("mode".to_string(), "rwc".to_string()));
            }
            format!(
                "sqlite:{}{}",
                utf8_percent_encode(&path, FILE_NAME),
                render_query(&options)
            )
        }
    }
}

pub(crate) fn pool_options(location: &SqliteLocation, options: AnyPoolOptions) -> AnyPoolOptions {
    match location {
        // Every new connection to `:memory:` opens a distinct empty database, so the
        // pool is pinned to one connection that lives as long as the engine.
        SqliteLocation::Memory => options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None),
        SqliteLocation::File(_) => options.after_connect(|conn, _meta| {
            Box::pin(async move {
                // WAL lets readers keep a snapshot while another session commits.
                conn.execute("PRAGMA journal_mode = WAL").await?;
                conn.execute("PRAGMA synchronous = NORMAL").await?;
                Ok(())
            })
        }),
    }
}

/// Constructors for SQLite-backed databases.
pub struct SqliteDatabase;

impl SqliteDatabase {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>, schema: Schema) -> Result<Database, DbError> {
        Database::connect(&ConnectionConfig::sqlite(path), schema).await
    }

    /// Opens a private in-memory database.
    pub async fn in_memory(schema: Schema) -> Result<Database, DbError> {
        Database::connect(&ConnectionConfig::sqlite_in_memory(), schema).await
    }
}
