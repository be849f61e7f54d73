use crate::error::DbError;
use crate::schema::quote_ident;
use configuration::Backend;
use sqlx::any::{Any, AnyRow};
use sqlx::AnyConnection;
use sqlx::Transaction;
use std::ops::{Deref, DerefMut};

/// A unit of work against the engine.
///
/// A session is a database transaction. Changes become visible to other sessions
/// only after [`Session::commit`]; a session dropped without committing (including
/// on early return or panic) is rolled back. A session is owned by one task at a time.
///
/// It dereferences to the underlying connection, so any `sqlx` query can run inside it:
///
/// ```ignore
/// let mut session = db.session().await?;
/// sqlx::query("INSERT INTO users (email) VALUES (?)")
///     .bind("ada@example.com")
///     .execute(&mut *session)
///     .await?;
/// session.commit().await?;
/// ```
pub struct Session {
    tx: Transaction<'static, Any>,
    backend: Backend,
}

impl Session {
    pub(crate) fn new(tx: Transaction<'static, Any>, backend: Backend) -> Self {
        tracing::debug!(%backend, "Session opened.");
        Self { tx, backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Runs a statement and returns the number of rows it affected.
    pub async fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        let result = sqlx::query(sql).execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    pub async fn fetch_all(&mut self, sql: &str) -> Result<Vec<AnyRow>, DbError> {
        Ok(sqlx::query(sql).fetch_all(&mut *self.tx).await?)
    }

    pub async fn fetch_optional(&mut self, sql: &str) -> Result<Option<AnyRow>, DbError> {
        Ok(sqlx::query(sql).fetch_optional(&mut *self.tx).await?)
    }

    /// Number of rows in `table`, as seen by this session.
    pub async fn count(&mut self, table: &str) -> Result<i64, DbError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut *self.tx).await?)
    }

    /// Makes this session's changes visible to everyone.
    pub async fn commit(self) -> Result<(), DbError> {
        self.tx.commit().await?;
        tracing::debug!(backend = %self.backend, "Session committed.");
        Ok(())
    }

    /// Discards this session's changes.
    pub async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await?;
        tracing::debug!(backend = %self.backend, "Session rolled back.");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Deref for Session {
    type Target = AnyConnection;

    fn deref(&self) -> &Self::Target {
        &self.tx
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tx
    }
}
