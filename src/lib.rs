//! # dbkit
//!
//! Standardized engine creation, session handling, and connection-string
//! construction for SQLite and PostgreSQL, on top of `sqlx`.
//!
//! ```ignore
//! use dbkit::{Column, ColumnType, Database, Model, Schema, Table};
//!
//! struct User;
//!
//! impl Model for User {
//!     fn table() -> Table {
//!         Table::new("users")
//!             .column(Column::identity("id"))
//!             .column(Column::new("email", ColumnType::Text).not_null().unique())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Database::new("sqlite:///app.sqlite", Schema::new().register::<User>()).await?;
//!
//!     let mut session = db.session().await?;
//!     dbkit::sqlx::query("INSERT INTO users (email) VALUES (?)")
//!         .bind("ada@example.com")
//!         .execute(&mut *session)
//!         .await?;
//!     session.commit().await?;
//!     Ok(())
//! }
//! ```

pub use configuration::{
    Backend, ConnectionConfig, ConnectionTarget, LoggingConfig, PostgresParams, SqliteLocation, SqliteParams,
    error::ConfigError, init_logging, load_config, load_config_from,
};
pub use database::{
    Column, ColumnType, Database, DatabaseState, DbError, Model, PostgresDatabase, Schema,
    Session, SqliteDatabase, Table,
};
pub use sqlx;
