//! SQLite driver using `rusqlite`.
//!
//! [`SqliteBackend`] wraps a single `rusqlite::Connection` and runs every
//! call through `tokio::task::spawn_blocking` so the async runtime is never
//! blocked.
//!
//! Features:
//! - WAL mode for file databases
//! - In-memory database support via `:memory:` (used heavily in tests)
//! - A busy timeout, so a second migrator waits on `BEGIN IMMEDIATE`
//!   instead of failing with `SQLITE_BUSY`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use amigo_rs_core::{AmigoError, AmigoResult};
use amigo_rs_db::{DatabaseBackendType, DbExecutor, Row, Value};
use rusqlite::types::ValueRef;
use tokio::sync::Mutex;

/// How long a statement waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// A SQLite database backend.
pub struct SqliteBackend {
    /// The path to the database file (or ":memory:").
    path: PathBuf,
    /// The connection, guarded by an async mutex.
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteBackend {
    /// Opens a SQLite database at the given path.
    ///
    /// If the path is `:memory:`, an in-memory database is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> AmigoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = if path.to_str() == Some(":memory:") {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| AmigoError::OperationalError(format!("SQLite open failed: {e}")))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| AmigoError::OperationalError(format!("Failed to set busy timeout: {e}")))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|e| AmigoError::OperationalError(format!("Failed to set pragmas: {e}")))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| AmigoError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a database from a connection string, accepting an optional
    /// `sqlite://` or `sqlite:` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_url(url: &str) -> AmigoResult<Self> {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        Self::open(path)
    }

    /// Opens an in-memory database (convenience constructor).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory() -> AmigoResult<Self> {
        Self::open(":memory:")
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Binds `Value`s to a `rusqlite` statement.
    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> AmigoResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Text(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Timestamp(dt) => stmt.raw_bind_parameter(
                    idx,
                    dt.format("%Y-%m-%d %H:%M:%S").to_string().as_str(),
                ),
            }
            .map_err(|e| AmigoError::DatabaseError(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    /// Converts a `rusqlite::Row` to our generic `Row`.
    ///
    /// The ledger only stores integers, text and timestamps (as text), so
    /// real and blob cells are rejected.
    fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> AmigoResult<Row> {
        let values = column_names
            .iter()
            .enumerate()
            .map(|(i, column)| match sqlite_row.get_ref(i).map_err(|e| map_err(&e))? {
                ValueRef::Null => Ok(Value::Null),
                ValueRef::Integer(v) => Ok(Value::Int(v)),
                ValueRef::Text(b) => Ok(Value::Text(String::from_utf8_lossy(b).into_owned())),
                ValueRef::Real(_) | ValueRef::Blob(_) => Err(AmigoError::DatabaseError(format!(
                    "Unsupported column type for '{column}'"
                ))),
            })
            .collect::<AmigoResult<Vec<Value>>>()?;

        Ok(Row::new(column_names.to_vec(), values))
    }
}

/// Maps a driver error, singling out constraint violations.
fn map_err(e: &rusqlite::Error) -> AmigoError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AmigoError::IntegrityError(e.to_string())
        }
        _ => AmigoError::DatabaseError(e.to_string()),
    }
}

fn join_err(e: &tokio::task::JoinError) -> AmigoError {
    AmigoError::DatabaseError(format!("Task join error: {e}"))
}

#[async_trait::async_trait]
impl DbExecutor for SqliteBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> AmigoResult<u64> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&sql).map_err(|e| map_err(&e))?;
            Self::bind_params(&mut stmt, &params)?;
            let count = stmt.raw_execute().map_err(|e| map_err(&e))?;
            Ok(count as u64)
        })
        .await
        .map_err(|e| join_err(&e))?
    }

    async fn execute_batch(&self, sql: &str) -> AmigoResult<()> {
        let conn = self.conn.clone();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute_batch(&sql).map_err(|e| map_err(&e))
        })
        .await
        .map_err(|e| join_err(&e))?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> AmigoResult<Vec<Row>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&sql).map_err(|e| map_err(&e))?;

            let column_names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();

            Self::bind_params(&mut stmt, &params)?;

            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows.next().map_err(|e| map_err(&e))? {
                rows.push(Self::convert_row(row, &column_names)?);
            }

            Ok(rows)
        })
        .await
        .map_err(|e| join_err(&e))?
    }
}
