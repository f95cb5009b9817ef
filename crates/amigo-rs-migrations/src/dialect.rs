//! Per-engine SQL for the bookkeeping table.
//!
//! Migration bodies are passed through verbatim; the only SQL amigo writes
//! itself is the ledger's DDL and its three queries. [`Dialect`] supplies
//! that SQL for one engine. The engine receives a dialect explicitly, so
//! several engines with different dialects can coexist in one process.

use amigo_rs_core::{AmigoError, AmigoResult};
use amigo_rs_db::DatabaseBackendType;

/// Default name of the bookkeeping table.
pub const DEFAULT_TABLE_NAME: &str = "amigo_migrations";

/// SQL syntax for the bookkeeping table on one database engine.
///
/// Implementors provide the DDL and identifier quoting; the ledger queries
/// have default implementations built from those.
pub trait Dialect: Send + Sync {
    /// Returns the backend this dialect targets.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Returns an idempotent `CREATE TABLE IF NOT EXISTS` statement for the
    /// bookkeeping table.
    fn create_table_sql(&self, table_name: &str) -> String;

    /// Looks the bookkeeping table up in the catalog; binds `(table_name)`
    /// and yields one row when the table exists.
    fn table_exists_sql(&self) -> String;

    /// Quotes an identifier.
    fn quote_name(&self, name: &str) -> String {
        format!("\"{name}\"")
    }

    /// Returns a parameter placeholder for the given 1-based index.
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Selects the ledger in priority order.
    fn select_applied_sql(&self, table_name: &str) -> String {
        format!(
            "SELECT name, priority, created_at FROM {} ORDER BY priority",
            self.quote_name(table_name)
        )
    }

    /// Inserts one ledger row; binds `(name, priority)`.
    fn insert_applied_sql(&self, table_name: &str) -> String {
        format!(
            "INSERT INTO {} (name, priority) VALUES ({}, {})",
            self.quote_name(table_name),
            self.placeholder(1),
            self.placeholder(2)
        )
    }

    /// Deletes the ledger row at a priority; binds `(priority)`.
    fn delete_applied_sql(&self, table_name: &str) -> String {
        format!(
            "DELETE FROM {} WHERE priority = {}",
            self.quote_name(table_name),
            self.placeholder(1)
        )
    }
}

// ── SQLite ──────────────────────────────────────────────────────────────

/// SQLite: `INTEGER PRIMARY KEY AUTOINCREMENT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    fn create_table_sql(&self, table_name: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id INTEGER PRIMARY KEY AUTOINCREMENT, \
                name VARCHAR(255) NOT NULL, \
                priority INTEGER NOT NULL, \
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
                CONSTRAINT {uq} UNIQUE (name)\
            )",
            table = self.quote_name(table_name),
            uq = self.quote_name(&format!("{table_name}_name_uq")),
        )
    }

    fn table_exists_sql(&self) -> String {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?".to_string()
    }
}

// ── PostgreSQL ──────────────────────────────────────────────────────────

/// PostgreSQL: `SERIAL` keys and `$n` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::PostgreSQL
    }

    fn create_table_sql(&self, table_name: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id SERIAL NOT NULL, \
                name VARCHAR(255) NOT NULL, \
                priority INTEGER NOT NULL, \
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
                CONSTRAINT {pk} PRIMARY KEY (id), \
                CONSTRAINT {uq} UNIQUE (name)\
            )",
            table = self.quote_name(table_name),
            pk = self.quote_name(&format!("{table_name}_id_pk")),
            uq = self.quote_name(&format!("{table_name}_name_uq")),
        )
    }

    fn table_exists_sql(&self) -> String {
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = $1"
            .to_string()
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }
}

// ── MySQL ───────────────────────────────────────────────────────────────

/// MySQL and MariaDB: `AUTO_INCREMENT` keys and backtick quoting.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::MySQL
    }

    fn create_table_sql(&self, table_name: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id INT NOT NULL AUTO_INCREMENT, \
                name VARCHAR(255) NOT NULL, \
                priority INT NOT NULL, \
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
                CONSTRAINT {pk} PRIMARY KEY (id), \
                CONSTRAINT {uq} UNIQUE (name)\
            )",
            table = self.quote_name(table_name),
            pk = self.quote_name(&format!("{table_name}_id_pk")),
            uq = self.quote_name(&format!("{table_name}_name_uq")),
        )
    }

    fn table_exists_sql(&self) -> String {
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_name = ?"
            .to_string()
    }

    fn quote_name(&self, name: &str) -> String {
        format!("`{name}`")
    }
}

/// Checks that a bookkeeping table name is a plain identifier.
///
/// The name is interpolated into DDL and constraint names, so anything else
/// is rejected.
///
/// # Errors
///
/// Returns [`AmigoError::ConfigurationError`] for an empty or malformed name.
pub fn validate_table_name(name: &str) -> AmigoResult<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AmigoError::ConfigurationError(format!(
            "Invalid migrations table name '{name}'"
        )))
    }
}

/// Returns the dialect for a backend.
pub fn dialect_for(backend: DatabaseBackendType) -> Box<dyn Dialect> {
    match backend {
        DatabaseBackendType::SQLite => Box::new(SqliteDialect),
        DatabaseBackendType::PostgreSQL => Box::new(PostgresDialect),
        DatabaseBackendType::MySQL => Box::new(MySqlDialect),
    }
}

/// Returns the dialect for a driver identifier such as `sqlite3` or `postgres`.
///
/// # Errors
///
/// Unknown identifiers are an
/// [`ImproperlyConfigured`](amigo_rs_core::AmigoError::ImproperlyConfigured) error.
pub fn dialect_for_driver(driver: &str) -> AmigoResult<Box<dyn Dialect>> {
    DatabaseBackendType::from_driver(driver).map(dialect_for)
}
