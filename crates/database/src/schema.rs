//! Portable table definitions and the per-database schema registry.
//!
//! Application entities describe their table by implementing [`Model`] and are
//! registered explicitly on a [`Schema`]. The schema is handed to a
//! [`crate::Database`] at construction, which uses it to create and drop tables;
//! two databases in the same process can therefore manage unrelated schemas.

use crate::error::DbError;
use configuration::Backend;
use std::collections::HashSet;

/// Column types that map onto both backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    BigInt,
    Text,
    Float,
    Boolean,
    Blob,
}

impl ColumnType {
    fn sql(self, backend: Backend) -> &'static str {
        match (self, backend) {
            (ColumnType::Integer, _) => "INTEGER",
            (ColumnType::BigInt, Backend::Sqlite) => "INTEGER",
            (ColumnType::BigInt, Backend::Postgres) => "BIGINT",
            (ColumnType::Text, _) => "TEXT",
            (ColumnType::Float, Backend::Sqlite) => "REAL",
            (ColumnType::Float, Backend::Postgres) => "DOUBLE PRECISION",
            (ColumnType::Boolean, _) => "BOOLEAN",
            (ColumnType::Blob, Backend::Sqlite) => "BLOB",
            (ColumnType::Blob, Backend::Postgres) => "BYTEA",
        }
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    ty: ColumnType,
    nullable: bool,
    primary_key: bool,
    identity: bool,
    unique: bool,
    default: Option<String>,
    references: Option<(String, String)>,
}

impl Column {
    /// A nullable column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            primary_key: false,
            identity: false,
            unique: false,
            default: None,
            references: None,
        }
    }

    /// An auto-assigned 64-bit integer primary key.
    pub fn identity(name: impl Into<String>) -> Self {
        Self {
            nullable: false,
            primary_key: true,
            identity: true,
            ..Self::new(name, ColumnType::BigInt)
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Raw SQL default expression, e.g. `0` or `'pending'`.
    pub fn default_sql(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Foreign key to `table(column)`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some((table.into(), column.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    fn sql(&self, backend: Backend, inline_primary_key: bool) -> String {
        let mut sql = quote_ident(&self.name);
        if self.identity {
            match backend {
                // Only `INTEGER PRIMARY KEY` aliases the rowid.
                Backend::Sqlite => sql.push_str(" INTEGER PRIMARY KEY"),
                Backend::Postgres => {
                    sql.push(' ');
                    sql.push_str(self.ty.sql(backend));
                    sql.push_str(" GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY");
                }
            }
        } else {
            sql.push(' ');
            sql.push_str(self.ty.sql(backend));
            if inline_primary_key && self.primary_key {
                sql.push_str(" PRIMARY KEY");
            }
            if !self.nullable {
                sql.push_str(" NOT NULL");
            }
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if let Some((table, column)) = &self.references {
            sql.push_str(&format!(" REFERENCES {}({})", quote_ident(table), quote_ident(column)));
        }
        sql
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn validate(&self) -> Result<(), DbError> {
        if self.name.trim().is_empty() {
            return Err(DbError::InvalidSchema("table name must not be empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(DbError::InvalidSchema(format!(
                "table '{}' has no columns",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(DbError::InvalidSchema(format!(
                    "table '{}' has a column without a name",
                    self.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(DbError::InvalidSchema(format!(
                    "table '{}' defines column '{}' twice",
                    self.name, column.name
                )));
            }
        }
        let identities = self.columns.iter().filter(|c| c.identity).count();
        let keys = self.columns.iter().filter(|c| c.primary_key).count();
        if identities > 1 || (identities == 1 && keys > 1) {
            return Err(DbError::InvalidSchema(format!(
                "table '{}' mixes an identity column with other primary key columns",
                self.name
            )));
        }
        Ok(())
    }

    /// `CREATE TABLE IF NOT EXISTS` for the given backend.
    pub fn create_sql(&self, backend: Backend) -> String {
        let keys: Vec<&Column> = self.columns.iter().filter(|c| c.primary_key).collect();
        let inline_primary_key = keys.len() == 1;

        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.sql(backend, inline_primary_key))
            .collect();
        if keys.len() > 1 {
            let names: Vec<String> = keys.iter().map(|c| quote_ident(&c.name)).collect();
            parts.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_ident(&self.name),
            parts.join(",\n    ")
        )
    }

    /// `DROP TABLE IF EXISTS` for the given backend.
    pub fn drop_sql(&self, _backend: Backend) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_ident(&self.name))
    }
}

/// Implemented by application entities to declare their table.
pub trait Model {
    fn table() -> Table;
}

/// The set of tables a [`crate::Database`] creates and drops.
///
/// Tables are created in registration order and dropped in reverse, so register
/// referenced tables before the tables that point at them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity's table.
    pub fn register<M: Model>(self) -> Self {
        self.add_table(M::table())
    }

    /// Registers a table. A table with the same name replaces the earlier definition.
    pub fn add_table(mut self, table: Table) -> Self {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => {
                tracing::warn!(table = %table.name, "Replacing previously registered table definition.");
                *existing = table;
            }
            None => self.tables.push(table),
        }
        self
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Checks every table definition before any DDL is issued.
    pub fn validate(&self) -> Result<(), DbError> {
        self.tables.iter().try_for_each(Table::validate)
    }

    /// `(table, statement)` pairs that create every table, in registration order.
    pub(crate) fn create_statements(&self, backend: Backend) -> Vec<(String, String)> {
        self.tables
            .iter()
            .map(|t| (t.name.clone(), t.create_sql(backend)))
            .collect()
    }

    /// `(table, statement)` pairs that drop every table, in reverse registration order.
    pub(crate) fn drop_statements(&self, backend: Backend) -> Vec<(String, String)> {
        self.tables
            .iter()
            .rev()
            .map(|t| (t.name.clone(), t.drop_sql(backend)))
            .collect()
    }
}

/// Double-quotes an identifier, escaping embedded quotes. Valid on both backends.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct User;

    impl Model for User {
        fn table() -> Table {
            Table::new("users")
                .column(Column::identity("id"))
                .column(Column::new("email", ColumnType::Text).not_null().unique())
                .column(Column::new("active", ColumnType::Boolean).not_null().default_sql("TRUE"))
        }
    }

    struct Post;

    impl Model for Post {
        fn table() -> Table {
            Table::new("posts")
                .column(Column::identity("id"))
                .column(Column::new("user_id", ColumnType::BigInt).not_null().references("users", "id"))
                .column(Column::new("body", ColumnType::Text))
        }
    }

    #[test]
    fn test_sqlite_ddl() {
        assert_eq!(
            User::table().create_sql(Backend::Sqlite),
            "CREATE TABLE IF NOT EXISTS \"users\" (\n    \
             \"id\" INTEGER PRIMARY KEY,\n    \
             \"email\" TEXT NOT NULL UNIQUE,\n    \
             \"active\" BOOLEAN NOT NULL DEFAULT TRUE\n)"
        );
    }

    #[test]
    fn test_postgres_ddl() {
        assert_eq!(
            Post::table().create_sql(Backend::Postgres),
            "CREATE TABLE IF NOT EXISTS \"posts\" (\n    \
             \"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,\n    \
             \"user_id\" BIGINT NOT NULL REFERENCES \"users\"(\"id\"),\n    \
             \"body\" TEXT\n)"
        );
    }

    #[test]
    fn test_composite_primary_key() {
        let table = Table::new("memberships")
            .column(Column::new("user_id", ColumnType::BigInt).primary_key())
            .column(Column::new("group_id", ColumnType::BigInt).primary_key());
        assert_eq!(
            table.create_sql(Backend::Postgres),
            "CREATE TABLE IF NOT EXISTS \"memberships\" (\n    \
             \"user_id\" BIGINT NOT NULL,\n    \
             \"group_id\" BIGINT NOT NULL,\n    \
             PRIMARY KEY (\"user_id\", \"group_id\")\n)"
        );
    }

    #[test]
    fn test_drop_order_is_reverse_of_registration() {
        let schema = Schema::new().register::<User>().register::<Post>();
        let created: Vec<String> = schema
            .create_statements(Backend::Sqlite)
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        let dropped: Vec<String> = schema
            .drop_statements(Backend::Sqlite)
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(created, vec!["users", "posts"]);
        assert_eq!(dropped, vec!["posts", "users"]);
    }

    #[test]
    fn test_reregistering_replaces_definition() {
        let schema = Schema::new()
            .register::<User>()
            .add_table(Table::new("users").column(Column::identity("id")));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.table("users").map(|t| t.columns().len()), Some(1));
    }

    #[test]
    fn test_validation() {
        assert!(Schema::new().register::<User>().validate().is_ok());

        let empty = Schema::new().add_table(Table::new("empty"));
        assert!(matches!(empty.validate(), Err(DbError::InvalidSchema(_))));

        let duplicate = Schema::new().add_table(
            Table::new("dup")
                .column(Column::new("a", ColumnType::Text))
                .column(Column::new("a", ColumnType::Integer)),
        );
        assert!(matches!(duplicate.validate(), Err(DbError::InvalidSchema(_))));

        let mixed = Schema::new().add_table(
            Table::new("mixed")
                .column(Column::identity("id"))
                .column(Column::new("other", ColumnType::Integer).primary_key()),
        );
        assert!(matches!(mixed.validate(), Err(DbError::InvalidSchema(_))));
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
