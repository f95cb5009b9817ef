//! The applied-set store.
//!
//! [`MigrationRecorder`] owns the bookkeeping table: one row per applied
//! migration holding its name, its priority (the file's position in the
//! sorted listing when it was applied) and the time it was recorded.

use amigo_rs_core::{AmigoError, AmigoResult};
use amigo_rs_db::{DbExecutor, Value};
use chrono::NaiveDateTime;

use crate::dialect::Dialect;

/// One row of the bookkeeping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    /// The migration file name.
    pub name: String,
    /// Position of the file in the sorted listing when it was applied.
    pub priority: i64,
    /// When the row was written, if the driver returned it.
    pub applied_at: Option<NaiveDateTime>,
}

/// Reads and writes the bookkeeping table through a [`DbExecutor`].
///
/// The recorder holds pre-rendered SQL, so it borrows nothing from the
/// dialect after construction.
#[derive(Debug, Clone)]
pub struct MigrationRecorder {
    table_name: String,
    create_sql: String,
    exists_sql: String,
    select_sql: String,
    insert_sql: String,
    delete_sql: String,
}

impl MigrationRecorder {
    /// Creates a recorder for `table_name` using the given dialect's SQL.
    pub fn new(table_name: impl Into<String>, dialect: &dyn Dialect) -> Self {
        let table_name = table_name.into();
        Self {
            create_sql: dialect.create_table_sql(&table_name),
            exists_sql: dialect.table_exists_sql(),
            select_sql: dialect.select_applied_sql(&table_name),
            insert_sql: dialect.insert_applied_sql(&table_name),
            delete_sql: dialect.delete_applied_sql(&table_name),
            table_name,
        }
    }

    /// Returns the bookkeeping table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Creates the bookkeeping table if it does not exist.
    pub async fn ensure_table(&self, db: &dyn DbExecutor) -> AmigoResult<()> {
        tracing::debug!(sql = %self.create_sql, "ensuring migrations table");
        db.execute_sql(&self.create_sql, &[]).await?;
        Ok(())
    }

    /// Reports whether the bookkeeping table exists, without creating it.
    pub async fn has_table(&self, db: &dyn DbExecutor) -> AmigoResult<bool> {
        let rows = db
            .query(&self.exists_sql, &[Value::from(self.table_name.as_str())])
            .await?;
        Ok(!rows.is_empty())
    }

    /// Returns the ledger, ordered by priority.
    pub async fn applied(&self, db: &dyn DbExecutor) -> AmigoResult<Vec<AppliedMigration>> {
        let rows = db.query(&self.select_sql, &[]).await?;
        rows.iter()
            .map(|row| {
                Ok(AppliedMigration {
                    name: row.get("name")?,
                    priority: row.get("priority")?,
                    applied_at: row.get("created_at")?,
                })
            })
            .collect()
    }

    /// Records a migration as applied at `priority`.
    ///
    /// A name that is already recorded fails with
    /// [`AmigoError::IntegrityError`].
    pub async fn record_applied(
        &self,
        db: &dyn DbExecutor,
        name: &str,
        priority: i64,
    ) -> AmigoResult<()> {
        db.execute_sql(&self.insert_sql, &[Value::from(name), Value::from(priority)])
            .await?;
        Ok(())
    }

    /// Deletes the ledger row at `priority`, returning the number of rows
    /// removed.
    pub async fn record_unapplied(&self, db: &dyn DbExecutor, priority: i64) -> AmigoResult<u64> {
        let removed = db
            .execute_sql(&self.delete_sql, &[Value::from(priority)])
            .await?;
        if removed == 0 {
            tracing::warn!(
                table = %self.table_name,
                priority,
                "no ledger row at this priority"
            );
        }
        Ok(removed)
    }
}

/// Converts a ledger index into a stored priority.
pub(crate) fn priority_of(index: usize) -> AmigoResult<i64> {
    i64::try_from(index)
        .map_err(|_| AmigoError::DatabaseError(format!("Migration index {index} out of range")))
}
