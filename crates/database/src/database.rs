use crate::backends;
use crate::connection;
use crate::error::DbError;
use crate::schema::{Schema, quote_ident};
use crate::session::Session;
use configuration::{Backend, ConnectionConfig, ConnectionTarget};
use sqlx::AnyPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where a [`Database`] is in its lifecycle.
///
/// A failed `connect` never produces a `Database`, so only two states are observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    Connected,
    /// A schema operation failed part-way; the database refuses further work.
    Failed,
}

/// An engine handle bound to one backend, plus the schema it manages.
///
/// Cloning is cheap and every clone shares the same pool, so a `Database` can be
/// handed to any number of tasks. Units of work are obtained with [`Database::session`].
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    pool: AnyPool,
    target: ConnectionTarget,
    schema: Schema,
    failed: AtomicBool,
}

impl Database {
    /// Builds a database from a URI or a full [`ConnectionConfig`], choosing the
    /// backend from the URI scheme (or the config's backend hint).
    ///
    /// ```ignore
    /// let db = Database::new("sqlite:///:memory:", Schema::new().register::<User>()).await?;
    /// ```
    pub async fn new(config: impl Into<ConnectionConfig>, schema: Schema) -> Result<Self, DbError> {
        Self::connect(&config.into(), schema).await
    }

    /// Connects using the process configuration: `database.toml`, then `DATABASE_*`
    /// environment variables (a `.env` file is loaded first), then `DATABASE_URL`.
    pub async fn from_env(schema: Schema) -> Result<Self, DbError> {
        let config = configuration::load_config()?;
        Self::connect(&config, schema).await
    }

    /// Connects, then creates the registered tables. When `config.reinitialize` is
    /// set, existing tables are dropped first.
    pub async fn connect(config: &ConnectionConfig, schema: Schema) -> Result<Self, DbError> {
        let target = config.resolve()?;
        schema.validate()?;

        tracing::info!(
            backend = %target.backend(),
            uri = %target.redacted(),
            echo = config.echo,
            "Connecting to database."
        );
        let pool = connection::connect(&target, config).await.inspect_err(|e| {
            tracing::warn!(uri = %target.redacted(), error = %e, "Database connection failed.");
        })?;

        let db = Self {
            inner: Arc::new(Inner {
                pool,
                target,
                schema,
                failed: AtomicBool::new(false),
            }),
        };

        if config.reinitialize {
            db.reinitialize().await?;
        } else {
            db.create_tables().await?;
        }
        Ok(db)
    }

    pub fn backend(&self) -> Backend {
        self.inner.target.backend()
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.inner.target
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// The underlying connection pool.
    pub fn engine(&self) -> &AnyPool {
        &self.inner.pool
    }

    pub fn state(&self) -> DatabaseState {
        if self.inner.failed.load(Ordering::Acquire) {
            DatabaseState::Failed
        } else {
            DatabaseState::Connected
        }
    }

    fn ensure_connected(&self) -> Result<(), DbError> {
        match self.state() {
            DatabaseState::Connected => Ok(()),
            DatabaseState::Failed => Err(DbError::Failed),
        }
    }

    /// Opens a new unit of work.
    pub async fn session(&self) -> Result<Session, DbError> {
        self.ensure_connected()?;
        let tx = self.inner.pool.begin().await.map_err(DbError::ConnectionError)?;
        Ok(Session::new(tx, self.backend()))
    }

    /// Creates every registered table that does not exist yet.
    pub async fn create_tables(&self) -> Result<(), DbError> {
        self.ensure_connected()?;
        let statements = self.schema().create_statements(self.backend());
        self.run_ddl(statements).await
    }

    /// Drops every registered table. Irreversibly deletes their data.
    pub async fn drop_tables(&self) -> Result<(), DbError> {
        self.ensure_connected()?;
        let statements = self.schema().drop_statements(self.backend());
        self.run_ddl(statements).await
    }

    /// Drops and recreates every registered table in one transaction.
    ///
    /// Irreversibly deletes their data. On failure nothing is applied and the
    /// database moves to [`DatabaseState::Failed`].
    pub async fn reinitialize(&self) -> Result<(), DbError> {
        self.ensure_connected()?;
        tracing::info!(
            backend = %self.backend(),
            tables = self.schema().len(),
            "Reinitializing schema."
        );

        let backend = self.backend();
        let mut statements = self.schema().drop_statements(backend);
        statements.extend(self.schema().create_statements(backend));

        if let Err(e) = self.run_ddl(statements).await {
            self.inner.failed.store(true, Ordering::Release);
            tracing::warn!(error = %e, "Schema reinitialization failed; database marked as failed.");
            return Err(e);
        }
        Ok(())
    }

    async fn run_ddl(&self, statements: Vec<(String, String)>) -> Result<(), DbError> {
        if statements.is_empty() {
            return Ok(());
        }
        let mut tx = self.inner.pool.begin().await.map_err(DbError::ConnectionError)?;
        for (table, sql) in &statements {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|source| DbError::SchemaError {
                    table: table.clone(),
                    source,
                })?;
        }
        tx.commit().await.map_err(|source| DbError::SchemaError {
            table: statements
                .last()
                .map(|(table, _)| table.clone())
                .unwrap_or_default(),
            source,
        })?;
        Ok(())
    }

    /// Runs a raw statement outside any session and returns the rows affected.
    pub async fn execute(&self, sql: &str) -> Result<u64, DbError> {
        self.ensure_connected()?;
        let result = sqlx::query(sql).execute(&self.inner.pool).await?;
        Ok(result.rows_affected())
    }

    /// Deletes every row of a registered table in its own committed session.
    pub async fn delete_all(&self, table: &str) -> Result<u64, DbError> {
        if !self.schema().contains(table) {
            return Err(DbError::UnknownTable(table.to_string()));
        }
        let mut session = self.session().await?;
        let deleted = session
            .execute(&format!("DELETE FROM {}", quote_ident(table)))
            .await?;
        session.commit().await?;
        tracing::debug!(table, deleted, "Deleted all rows.");
        Ok(deleted)
    }

    /// Names of the tables that currently exist, whether registered or not.
    pub async fn table_names(&self) -> Result<Vec<String>, DbError> {
        self.ensure_connected()?;
        let sql = backends::list_tables_sql(&self.inner.target);
        Ok(sqlx::query_scalar::<_, String>(sql)
            .fetch_all(&self.inner.pool)
            .await?)
    }

    /// Closes the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.inner.pool.close().await;
        tracing::info!(backend = %self.backend(), "Database connection closed.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnType, Model, Table};
    use pretty_assertions::assert_eq;

    struct Note;

    impl Model for Note {
        fn table() -> Table {
            Table::new("notes")
                .column(Column::identity("id"))
                .column(Column::new("body", ColumnType::Text).not_null())
        }
    }

    async fn memory_db() -> Database {
        Database::new("sqlite:///:memory:", Schema::new().register::<Note>())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_creates_registered_tables() {
        let db = memory_db().await;
        assert_eq!(db.state(), DatabaseState::Connected);
        assert_eq!(db.backend(), Backend::Sqlite);
        assert_eq!(db.table_names().await.unwrap(), vec!["notes".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_schema_has_no_tables() {
        let db = Database::new("sqlite:///:memory:", Schema::new()).await.unwrap();
        assert_eq!(db.state(), DatabaseState::Connected);
        assert!(db.table_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reinitialize_empties_tables() {
        let db = memory_db().await;
        db.execute("INSERT INTO notes (body) VALUES ('one'), ('two')")
            .await
            .unwrap();

        for _ in 0..2 {
            db.reinitialize().await.unwrap();
            let mut session = db.session().await.unwrap();
            assert_eq!(session.count("notes").await.unwrap(), 0);
        }
        assert_eq!(db.state(), DatabaseState::Connected);
    }

    #[tokio::test]
    async fn test_drop_and_create_tables() {
        let db = memory_db().await;
        db.drop_tables().await.unwrap();
        assert!(db.table_names().await.unwrap().is_empty());
        db.create_tables().await.unwrap();
        assert_eq!(db.table_names().await.unwrap(), vec!["notes".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let db = memory_db().await;
        db.execute("INSERT INTO notes (body) VALUES ('one'), ('two'), ('three')")
            .await
            .unwrap();
        assert_eq!(db.delete_all("notes").await.unwrap(), 3);

        let mut session = db.session().await.unwrap();
        assert_eq!(session.count("notes").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_all_rejects_unregistered_table() {
        let db = memory_db().await;
        assert!(matches!(
            db.delete_all("missing").await,
            Err(DbError::UnknownTable(t)) if t == "missing"
        ));
    }

    #[tokio::test]
    async fn test_failed_reinitialize_poisons_database() {
        let db = memory_db().await;
        // A view where the table should be makes DROP TABLE fail.
        db.execute("DROP TABLE notes").await.unwrap();
        db.execute("CREATE VIEW notes AS SELECT 1 AS id").await.unwrap();

        let err = db.reinitialize().await.unwrap_err();
        assert!(matches!(&err, DbError::SchemaError { table, .. } if table == "notes"), "{err:?}");
        assert_eq!(db.state(), DatabaseState::Failed);

        assert!(matches!(db.session().await, Err(DbError::Failed)));
        assert!(matches!(db.reinitialize().await, Err(DbError::Failed)));
        assert!(matches!(db.execute("SELECT 1").await, Err(DbError::Failed)));
    }

    #[tokio::test]
    async fn test_invalid_schema_is_rejected_before_connecting() {
        let schema = Schema::new().add_table(Table::new("empty"));
        assert!(matches!(
            Database::new("sqlite:///:memory:", schema).await,
            Err(DbError::InvalidSchema(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        assert!(matches!(
            Database::new("unknown-scheme://host", Schema::new()).await,
            Err(DbError::UnsupportedBackendError(s)) if s == "unknown-scheme"
        ));
    }

    #[tokio::test]
    async fn test_mixed_parameters_are_a_configuration_error() {
        let mut config = ConnectionConfig::from_uri("sqlite:///:memory:");
        config.hostname = Some("localhost".to_string());
        assert!(matches!(
            Database::connect(&config, Schema::new()).await,
            Err(DbError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_clones_share_the_engine() {
        let db = memory_db().await;
        let clone = db.clone();
        clone
            .execute("INSERT INTO notes (body) VALUES ('shared')")
            .await
            .unwrap();
        let mut session = db.session().await.unwrap();
        assert_eq!(session.count("notes").await.unwrap(), 1);
    }
}
