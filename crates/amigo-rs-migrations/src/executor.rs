//! Reconciliation and execution.
//!
//! The [`MigrationExecutor`] compares the files a [`MigrationSource`] lists
//! against the ledger kept by the [`MigrationRecorder`], builds a
//! [`MigrationPlan`], and runs every step of the plan inside one database
//! transaction. Either the whole batch commits or none of it does.
//!
//! ## Priorities
//!
//! A migration's priority is the index of its file in the sorted listing at
//! the moment it was applied. Applying walks the listing and skips index `i`
//! only when ledger entry `i` carries the same name. Reverting walks the
//! ledger from the top and deletes the row whose priority equals the ledger
//! index. Both rules assume the ledger is a prefix of the listing; when it is
//! not, the executor logs a warning and proceeds with the same rules.

use std::future::Future;
use std::sync::Arc;

use amigo_rs_core::logging::migration_span;
use amigo_rs_core::{AmigoError, AmigoResult};
use amigo_rs_db::{
    atomic, atomic_with_isolation, DatabaseBackendType, DbExecutor, IsolationLevel,
    TransactionManager,
};
use chrono::NaiveDateTime;
use tracing::Instrument;

use crate::dialect::{dialect_for, validate_table_name, Dialect, DEFAULT_TABLE_NAME};
use crate::loader::MigrationSource;
use crate::recorder::{priority_of, AppliedMigration, MigrationRecorder};
use crate::script::{MarkerParser, ScriptParser};

/// A single step in a migration plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    /// The migration file name.
    pub name: String,
    /// The ledger index this step writes (forwards) or deletes (backwards).
    pub index: usize,
    /// If `true`, this step reverts the migration.
    pub backwards: bool,
}

impl MigrationStep {
    /// Creates a step that applies `name` at `index`.
    pub fn forward(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            backwards: false,
        }
    }

    /// Creates a step that reverts `name` and deletes the ledger row at `index`.
    pub fn backward(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            backwards: true,
        }
    }

    fn direction(&self) -> &'static str {
        if self.backwards {
            "down"
        } else {
            "up"
        }
    }
}

/// The ordered work list for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Steps to execute, in order.
    pub steps: Vec<MigrationStep>,
    /// Files left alone because the ledger already has them at their index.
    pub skipped: Vec<String>,
}

impl MigrationPlan {
    /// Plans an `up` run over the sorted `files` given the ledger names in
    /// priority order.
    pub fn forwards(files: &[String], ledger: &[String]) -> Self {
        let mut plan = Self::default();
        for (i, name) in files.iter().enumerate() {
            if ledger.get(i) == Some(name) {
                plan.skipped.push(name.clone());
            } else {
                plan.steps.push(MigrationStep::forward(name.clone(), i));
            }
        }
        plan
    }

    /// Plans a revert of the top `limit` ledger entries, or all of them when
    /// `limit` is `None`. Steps run from the highest index down.
    pub fn backwards(ledger: &[String], limit: Option<usize>) -> Self {
        let take = limit.unwrap_or(ledger.len());
        let steps = ledger
            .iter()
            .enumerate()
            .rev()
            .take(take)
            .map(|(i, name)| MigrationStep::backward(name.clone(), i))
            .collect();
        Self {
            steps,
            skipped: Vec::new(),
        }
    }

    /// Returns whether the plan has nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Everything the executor needs to know about its environment.
pub struct MigrationConfig {
    /// Name of the bookkeeping table.
    pub table_name: String,
    /// SQL dialect for the bookkeeping table.
    pub dialect: Box<dyn Dialect>,
    /// Isolation level for the batch transaction; the server default if `None`.
    pub isolation_level: Option<IsolationLevel>,
}

impl MigrationConfig {
    /// Creates a configuration with the default table name.
    pub fn new(dialect: Box<dyn Dialect>) -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            dialect,
            isolation_level: None,
        }
    }

    /// Creates a configuration for the given backend's dialect.
    pub fn for_backend(backend: DatabaseBackendType) -> Self {
        Self::new(dialect_for(backend))
    }

    /// Sets the bookkeeping table name.
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Sets the batch transaction's isolation level.
    #[must_use]
    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }
}

impl std::fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("table_name", &self.table_name)
            .field("dialect", &self.dialect.backend_type())
            .field("isolation_level", &self.isolation_level)
            .finish()
    }
}

/// Where a migration stands relative to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// The ledger has this file at the file's own index.
    Applied,
    /// The file is not in the ledger; `up` will apply it.
    Pending,
    /// The ledger has this file, but at a different index.
    Diverged,
    /// The ledger has an entry with no file on disk.
    Missing,
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Applied => "applied",
            Self::Pending => "pending",
            Self::Diverged => "diverged",
            Self::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// One line of a status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// The migration file name.
    pub name: String,
    /// Where the migration stands.
    pub state: MigrationState,
    /// The recorded priority, for migrations in the ledger.
    pub priority: Option<i64>,
    /// When the migration was recorded, for migrations in the ledger.
    pub applied_at: Option<NaiveDateTime>,
}

/// Applies and reverts migrations against one database.
pub struct MigrationExecutor {
    config: MigrationConfig,
    recorder: MigrationRecorder,
    parser: Box<dyn ScriptParser>,
}

impl MigrationExecutor {
    /// Creates an executor using the marker parser.
    ///
    /// # Errors
    ///
    /// Returns [`AmigoError::ConfigurationError`] if the table name is not a
    /// plain identifier.
    pub fn new(config: MigrationConfig) -> AmigoResult<Self> {
        validate_table_name(&config.table_name)?;
        let recorder = MigrationRecorder::new(config.table_name.clone(), config.dialect.as_ref());
        Ok(Self {
            config,
            recorder,
            parser: Box::new(MarkerParser::new()),
        })
    }

    /// Replaces the script parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Box<dyn ScriptParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Returns the recorder.
    pub fn recorder(&self) -> &MigrationRecorder {
        &self.recorder
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Applies every file that is not in the ledger at its own index.
    ///
    /// Returns the names applied, in order. Nothing is committed unless every
    /// step succeeds.
    pub async fn apply_pending(
        &self,
        source: &dyn MigrationSource,
        db: &dyn DbExecutor,
    ) -> AmigoResult<Vec<String>> {
        self.prepare(db).await?;
        self.run_in_transaction(db, |txn| async move {
            let db: &dyn DbExecutor = &*txn;
            let ledger = self.ledger_names(db).await?;
            let files = source.list_names()?;
            warn_on_divergence(&files, &ledger);

            let plan = MigrationPlan::forwards(&files, &ledger);
            for name in &plan.skipped {
                tracing::info!("> already migrated: {name}");
            }
            if plan.is_empty() {
                tracing::info!("No migrations to apply");
            }
            self.execute_plan(&plan, source, db).await
        })
        .await
    }

    /// Reverts every ledger entry, newest first.
    pub async fn revert_all(
        &self,
        source: &dyn MigrationSource,
        db: &dyn DbExecutor,
    ) -> AmigoResult<Vec<String>> {
        self.revert(source, db, None).await
    }

    /// Reverts the `steps` newest ledger entries. Zero steps does nothing.
    pub async fn revert_steps(
        &self,
        source: &dyn MigrationSource,
        db: &dyn DbExecutor,
        steps: usize,
    ) -> AmigoResult<Vec<String>> {
        if steps == 0 {
            tracing::info!("Nothing to roll back: zero steps requested");
            return Ok(Vec::new());
        }
        self.revert(source, db, Some(steps)).await
    }

    /// Reports every file and every ledger entry. Files come first in
    /// listing order, then ledger entries with no file, in priority order.
    ///
    /// The report only reads: a database without the bookkeeping table is
    /// treated as having an empty ledger and is left untouched.
    pub async fn status(
        &self,
        source: &dyn MigrationSource,
        db: &dyn DbExecutor,
    ) -> AmigoResult<Vec<MigrationStatus>> {
        self.check_backend(db)?;
        let applied = if self.recorder.has_table(db).await? {
            self.recorder.applied(db).await?
        } else {
            tracing::debug!(
                table = %self.recorder.table_name(),
                "migrations table does not exist yet"
            );
            Vec::new()
        };
        let files = source.list_names()?;
        Ok(build_status(&files, &applied))
    }

    // ── Internals ───────────────────────────────────────────────────

    fn check_backend(&self, db: &dyn DbExecutor) -> AmigoResult<()> {
        let expected = self.config.dialect.backend_type();
        if db.backend_type() != expected {
            return Err(AmigoError::ImproperlyConfigured(format!(
                "Dialect '{expected}' does not match the '{}' connection",
                db.backend_type()
            )));
        }
        Ok(())
    }

    async fn prepare(&self, db: &dyn DbExecutor) -> AmigoResult<()> {
        self.check_backend(db)?;
        self.recorder.ensure_table(db).await
    }

    async fn revert(
        &self,
        source: &dyn MigrationSource,
        db: &dyn DbExecutor,
        limit: Option<usize>,
    ) -> AmigoResult<Vec<String>> {
        self.prepare(db).await?;
        self.run_in_transaction(db, |txn| async move {
            let db: &dyn DbExecutor = &*txn;
            let applied = self.recorder.applied(db).await?;
            for (i, entry) in applied.iter().enumerate() {
                if usize::try_from(entry.priority).ok() != Some(i) {
                    tracing::warn!(
                        "Ledger entry '{}' has priority {} at position {i}",
                        entry.name,
                        entry.priority
                    );
                }
            }

            let ledger: Vec<String> = applied.into_iter().map(|m| m.name).collect();
            let plan = MigrationPlan::backwards(&ledger, limit);
            if plan.is_empty() {
                tracing::info!("No migrations to roll back");
            }
            self.execute_plan(&plan, source, db).await
        })
        .await
    }

    async fn run_in_transaction<'a, F, Fut, T>(&self, db: &'a dyn DbExecutor, f: F) -> AmigoResult<T>
    where
        F: FnOnce(Arc<TransactionManager<'a>>) -> Fut,
        Fut: Future<Output = AmigoResult<T>>,
    {
        match self.config.isolation_level {
            Some(level) => atomic_with_isolation(db, level, f).await,
            None => atomic(db, f).await,
        }
    }

    async fn ledger_names(&self, db: &dyn DbExecutor) -> AmigoResult<Vec<String>> {
        let applied = self.recorder.applied(db).await?;
        Ok(applied.into_iter().map(|m| m.name).collect())
    }

    async fn execute_plan(
        &self,
        plan: &MigrationPlan,
        source: &dyn MigrationSource,
        db: &dyn DbExecutor,
    ) -> AmigoResult<Vec<String>> {
        let mut done = Vec::with_capacity(plan.len());
        for step in &plan.steps {
            self.execute_step(step, source, db)
                .instrument(migration_span(&step.name, step.direction()))
                .await
                .map_err(|e| AmigoError::in_migration(&step.name, e))?;
            done.push(step.name.clone());
        }
        Ok(done)
    }

    async fn execute_step(
        &self,
        step: &MigrationStep,
        source: &dyn MigrationSource,
        db: &dyn DbExecutor,
    ) -> AmigoResult<()> {
        let content = source.read_script(&step.name)?;
        let script = self.parser.parse(&content);
        let body = script.body(step.backwards);

        if body.is_empty() {
            tracing::debug!("Empty {} section, nothing to execute", step.direction());
        } else {
            tracing::debug!("Executing SQL:\n{body}");
            db.execute_batch(body).await?;
        }

        let priority = priority_of(step.index)?;
        if step.backwards {
            self.recorder.record_unapplied(db, priority).await?;
            tracing::info!(">> rolled-back : {}", step.name);
        } else {
            self.recorder.record_applied(db, &step.name, priority).await?;
            tracing::info!(">> succeed : {}", step.name);
        }
        Ok(())
    }
}

fn warn_on_divergence(files: &[String], ledger: &[String]) {
    for (i, recorded) in ledger.iter().enumerate() {
        match files.get(i) {
            Some(file) if file == recorded => {}
            Some(file) => tracing::warn!(
                "Ledger entry {i} is '{recorded}' but file {i} is '{file}'"
            ),
            None => tracing::warn!("Ledger entry {i} is '{recorded}' but there is no file {i}"),
        }
    }
}

fn build_status(files: &[String], applied: &[AppliedMigration]) -> Vec<MigrationStatus> {
    let mut report = Vec::with_capacity(files.len());

    for (i, name) in files.iter().enumerate() {
        let status = match applied.get(i) {
            Some(entry) if &entry.name == name => MigrationStatus {
                name: name.clone(),
                state: MigrationState::Applied,
                priority: Some(entry.priority),
                applied_at: entry.applied_at,
            },
            _ => match applied.iter().find(|entry| &entry.name == name) {
                Some(entry) => MigrationStatus {
                    name: name.clone(),
                    state: MigrationState::Diverged,
                    priority: Some(entry.priority),
                    applied_at: entry.applied_at,
                },
                None => MigrationStatus {
                    name: name.clone(),
                    state: MigrationState::Pending,
                    priority: None,
                    applied_at: None,
                },
            },
        };
        report.push(status);
    }

    for entry in applied {
        if !files.contains(&entry.name) {
            report.push(MigrationStatus {
                name: entry.name.clone(),
                state: MigrationState::Missing,
                priority: Some(entry.priority),
                applied_at: entry.applied_at,
            });
        }
    }

    report
}
