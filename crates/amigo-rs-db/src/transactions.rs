//! Transaction support.
//!
//! Transactions are managed through the [`TransactionManager`] which wraps a
//! [`DbExecutor`] and tracks whether a transaction is open. The [`atomic()`]
//! function is the primary entry point: it begins a transaction, runs a
//! closure against it, commits on `Ok`, and rolls back on `Err`.
//!
//! Nesting is not supported. A migration run is exactly one transaction.
//!
//! # Examples
//!
//! ```ignore
//! use amigo_rs_db::transactions::atomic;
//!
//! atomic(db, |txn| async move {
//!     txn.execute_sql("INSERT INTO t (a) VALUES (1)", &[]).await?;
//!     Ok(())
//! })
//! .await?;
//! ```

use std::str::FromStr;
use std::sync::Arc;

use amigo_rs_core::{AmigoError, AmigoResult};
use tokio::sync::Mutex;

use crate::executor::{DatabaseBackendType, DbExecutor};
use crate::row::Row;
use crate::value::Value;

/// Transaction isolation levels supported by the major database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// READ UNCOMMITTED - lowest isolation level.
    ReadUncommitted,
    /// READ COMMITTED - prevents dirty reads. PostgreSQL default.
    ReadCommitted,
    /// REPEATABLE READ - prevents non-repeatable reads. MySQL default.
    RepeatableRead,
    /// SERIALIZABLE - strictest isolation level.
    Serializable,
}

impl IsolationLevel {
    /// Returns the SQL keyword form of this isolation level.
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }

    /// Returns the statement that selects this isolation level on the given
    /// backend.
    pub fn set_sql(&self, backend: DatabaseBackendType) -> String {
        match backend {
            // SQLite only distinguishes dirty reads, and only in shared-cache mode.
            DatabaseBackendType::SQLite => match self {
                Self::ReadUncommitted => "PRAGMA read_uncommitted = 1".to_string(),
                _ => "PRAGMA read_uncommitted = 0".to_string(),
            },
            DatabaseBackendType::PostgreSQL | DatabaseBackendType::MySQL => {
                format!("SET TRANSACTION ISOLATION LEVEL {}", self.as_sql())
            }
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = AmigoError;

    /// Parses `serializable`, `read committed`, `READ_COMMITTED`,
    /// `repeatable-read` and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_lowercase() })
            .collect();
        match normalized.as_str() {
            "read uncommitted" => Ok(Self::ReadUncommitted),
            "read committed" => Ok(Self::ReadCommitted),
            "repeatable read" => Ok(Self::RepeatableRead),
            "serializable" => Ok(Self::Serializable),
            _ => Err(AmigoError::ConfigurationError(format!(
                "Unknown isolation level '{s}'"
            ))),
        }
    }
}

/// Returns the statement that opens a transaction on the given backend.
///
/// SQLite takes the write lock up front so two migrators cannot both read
/// the ledger before either writes.
pub const fn begin_sql(backend: DatabaseBackendType) -> &'static str {
    match backend {
        DatabaseBackendType::SQLite => "BEGIN IMMEDIATE",
        DatabaseBackendType::PostgreSQL => "BEGIN",
        DatabaseBackendType::MySQL => "START TRANSACTION",
    }
}

/// Manages transaction state for a database connection.
pub struct TransactionManager<'a> {
    /// The underlying database executor.
    db: &'a dyn DbExecutor,
    /// Whether a transaction is currently open.
    active: Mutex<bool>,
}

impl<'a> TransactionManager<'a> {
    /// Creates a new transaction manager for the given executor.
    pub fn new(db: &'a dyn DbExecutor) -> Self {
        Self {
            db,
            active: Mutex::new(false),
        }
    }

    /// Returns `true` while a transaction is open.
    pub async fn is_active(&self) -> bool {
        *self.active.lock().await
    }

    /// Returns a reference to the underlying executor.
    pub fn executor(&self) -> &dyn DbExecutor {
        self.db
    }

    /// Begins a transaction.
    ///
    /// This is called automatically by [`atomic()`] and should not normally
    /// be called directly.
    pub async fn begin(&self) -> AmigoResult<()> {
        let mut active = self.active.lock().await;
        if *active {
            return Err(AmigoError::DatabaseError(
                "Cannot begin: a transaction is already open".to_string(),
            ));
        }
        self.db
            .execute_sql(begin_sql(self.db.backend_type()), &[])
            .await?;
        *active = true;
        Ok(())
    }

    /// Begins a transaction with a specific isolation level.
    pub async fn begin_with_isolation(&self, level: IsolationLevel) -> AmigoResult<()> {
        let mut active = self.active.lock().await;
        if *active {
            return Err(AmigoError::DatabaseError(
                "Cannot begin: a transaction is already open".to_string(),
            ));
        }
        let backend = self.db.backend_type();
        match backend {
            // SQLite pragmas and MySQL's SET TRANSACTION apply to the next
            // transaction, so they go first.
            DatabaseBackendType::SQLite | DatabaseBackendType::MySQL => {
                self.db.execute_sql(&level.set_sql(backend), &[]).await?;
                self.db.execute_sql(begin_sql(backend), &[]).await?;
            }
            // PostgreSQL requires SET TRANSACTION inside the transaction.
            DatabaseBackendType::PostgreSQL => {
                self.db.execute_sql(begin_sql(backend), &[]).await?;
                if let Err(e) = self.db.execute_sql(&level.set_sql(backend), &[]).await {
                    if let Err(rollback_err) = self.db.execute_sql("ROLLBACK", &[]).await {
                        tracing::warn!("Rollback after failed isolation setup failed: {rollback_err}");
                    }
                    return Err(e);
                }
            }
        }
        *active = true;
        Ok(())
    }

    /// Commits the current transaction.
    pub async fn commit(&self) -> AmigoResult<()> {
        let mut active = self.active.lock().await;
        if !*active {
            return Err(AmigoError::DatabaseError(
                "Cannot commit: not in a transaction".to_string(),
            ));
        }
        *active = false;
        self.db.execute_sql("COMMIT", &[]).await?;
        Ok(())
    }

    /// Rolls back the current transaction.
    pub async fn rollback(&self) -> AmigoResult<()> {
        let mut active = self.active.lock().await;
        if !*active {
            return Err(AmigoError::DatabaseError(
                "Cannot rollback: not in a transaction".to_string(),
            ));
        }
        *active = false;
        self.db.execute_sql("ROLLBACK", &[]).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DbExecutor for TransactionManager<'_> {
    fn backend_type(&self) -> DatabaseBackendType {
        self.db.backend_type()
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> AmigoResult<u64> {
        self.db.execute_sql(sql, params).await
    }

    async fn execute_batch(&self, sql: &str) -> AmigoResult<()> {
        self.db.execute_batch(sql).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> AmigoResult<Vec<Row>> {
        self.db.query(sql, params).await
    }
}

/// Executes a closure within a database transaction.
///
/// If the closure returns `Ok`, the transaction is committed. If it returns
/// `Err`, the transaction is rolled back and the closure's error is returned
/// (a failing rollback does not mask it).
pub async fn atomic<'a, F, Fut, T>(db: &'a dyn DbExecutor, f: F) -> AmigoResult<T>
where
    F: FnOnce(Arc<TransactionManager<'a>>) -> Fut,
    Fut: std::future::Future<Output = AmigoResult<T>>,
{
    let txn = Arc::new(TransactionManager::new(db));
    txn.begin().await?;
    finish(&txn, f(Arc::clone(&txn)).await).await
}

/// Executes a closure within a transaction with a specific isolation level.
///
/// Works like [`atomic()`] but selects the isolation level before the first
/// statement executes.
pub async fn atomic_with_isolation<'a, F, Fut, T>(
    db: &'a dyn DbExecutor,
    level: IsolationLevel,
    f: F,
) -> AmigoResult<T>
where
    F: FnOnce(Arc<TransactionManager<'a>>) -> Fut,
    Fut: std::future::Future<Output = AmigoResult<T>>,
{
    let txn = Arc::new(TransactionManager::new(db));
    txn.begin_with_isolation(level).await?;
    finish(&txn, f(Arc::clone(&txn)).await).await
}

async fn finish<T>(txn: &TransactionManager<'_>, outcome: AmigoResult<T>) -> AmigoResult<T> {
    match outcome {
        Ok(result) => {
            txn.commit().await?;
            Ok(result)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!("Rollback failed: {rollback_err}");
            }
            Err(e)
        }
    }
}
