//! The database executor trait.
//!
//! [`DbExecutor`] is the minimal async interface the migration engine needs
//! from a connection. It is implemented by the drivers in
//! `amigo-rs-db-backends` and by [`TransactionManager`](crate::transactions::TransactionManager),
//! which forwards to the connection it wraps.

use std::fmt;

use amigo_rs_core::{AmigoError, AmigoResult};

use crate::row::Row;
use crate::value::Value;

/// The type of database behind an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    PostgreSQL,
    /// SQLite (uses `?` placeholders).
    SQLite,
    /// MySQL and MariaDB (uses `?` placeholders).
    MySQL,
}

impl DatabaseBackendType {
    /// Resolves a driver identifier such as `sqlite3`, `postgres` or `mysql`.
    ///
    /// Matching is case-insensitive. Unknown identifiers are an
    /// [`AmigoError::ImproperlyConfigured`] error.
    pub fn from_driver(driver: &str) -> AmigoResult<Self> {
        match driver.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::SQLite),
            "postgres" | "postgresql" | "pg" => Ok(Self::PostgreSQL),
            "mysql" | "mariadb" => Ok(Self::MySQL),
            other => Err(AmigoError::ImproperlyConfigured(format!(
                "Unknown database driver '{other}' (expected one of: sqlite3, postgres, mysql)"
            ))),
        }
    }
}

impl fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostgreSQL => write!(f, "postgresql"),
            Self::SQLite => write!(f, "sqlite"),
            Self::MySQL => write!(f, "mysql"),
        }
    }
}

/// Minimal async database executor trait.
///
/// Implementations hold a single connection, so statements issued through
/// one executor (including `BEGIN`/`COMMIT`) share a session.
#[async_trait::async_trait]
pub trait DbExecutor: Send + Sync {
    /// Returns the backend type.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Runs a single SQL statement that does not return rows.
    /// Returns the number of rows affected.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> AmigoResult<u64>;

    /// Runs a script that may hold several `;`-separated statements and no
    /// parameters. Migration bodies go through here.
    ///
    /// The default forwards to [`execute_sql`](Self::execute_sql), which is
    /// only correct for single statements; drivers override it.
    async fn execute_batch(&self, sql: &str) -> AmigoResult<()> {
        self.execute_sql(sql, &[]).await.map(|_| ())
    }

    /// Runs a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> AmigoResult<Vec<Row>>;
}
