//! # Database Crate
//!
//! A thin, backend-agnostic layer over `sqlx` that standardizes how the rest of
//! an application obtains an engine (connection pool) and units of work.
//!
//! ## Architectural Principles
//!
//! - **Delegation:** Query execution, pooling, and transaction semantics all
//!   belong to `sqlx` and the database drivers. This crate only assembles
//!   configuration, creates the pool, and manages the registered schema.
//! - **Closed backend set:** Backends are the variants of
//!   [`configuration::Backend`], dispatched with exhaustive `match`es.
//! - **Explicit schema:** Tables are registered on a [`Schema`] owned by each
//!   [`Database`]; there is no process-wide registry.
//! - **Scoped sessions:** A [`Session`] is a transaction that rolls back unless
//!   committed, on every exit path.
//!
//! ## Public API
//!
//! - `Database::new`: The factory that detects the backend from a URI and connects.
//! - `Database`: Holds the pool and schema and provides `session`, `reinitialize`,
//!   `create_tables`, `drop_tables`, `execute`, and `delete_all`.
//! - `SqliteDatabase` / `PostgresDatabase`: Backend-specific constructors.
//! - `Schema`, `Table`, `Column`, `Model`: Portable table definitions.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod backends;
pub mod connection;
pub mod database;
pub mod error;
pub mod schema;
pub mod session;

// Re-export the key components to create a clean, public-facing API.
pub use backends::{PostgresDatabase, SqliteDatabase};
pub use database::{Database, DatabaseState};
pub use error::DbError;
pub use schema::{Column, ColumnType, Model, Schema, Table};
pub use session::Session;
