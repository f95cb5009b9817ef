//! # amigo-rs-migrations
//!
//! The migration engine. Parses up/down scripts, reconciles files on disk
//! against the bookkeeping table, and applies or reverts them in a single
//! transaction.
//!
//! ## Architecture
//!
//! - [`MarkerParser`] splits a file into its up and down sections.
//! - [`Dialect`] renders the bookkeeping table's SQL for one engine.
//! - [`MigrationLoader`] lists and reads migration files.
//! - [`MigrationRecorder`] reads and writes the ledger.
//! - [`MigrationExecutor`] plans and runs `up`, `down`, `rollback` and `status`.
//! - [`MigrationTemplate`] writes new, timestamp-named skeletons.
//!
//! ## Module Overview
//!
//! - [`script`] - `ScriptParser`, `MarkerParser`, `ParsedScript`
//! - [`dialect`] - `Dialect` and the SQLite/PostgreSQL/MySQL implementations
//! - [`loader`] - `MigrationSource`, `MigrationLoader`, `MemorySource`
//! - [`recorder`] - `MigrationRecorder`, `AppliedMigration`
//! - [`executor`] - `MigrationExecutor`, `MigrationPlan`, `MigrationConfig`
//! - [`template`] - `MigrationTemplate`, `TemplateKind`

#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::use_self)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::future_not_send)]

pub mod dialect;
pub mod executor;
pub mod loader;
pub mod recorder;
pub mod script;
pub mod template;

pub use dialect::{
    dialect_for, dialect_for_driver, Dialect, MySqlDialect, PostgresDialect, SqliteDialect,
    DEFAULT_TABLE_NAME,
};
pub use executor::{
    MigrationConfig, MigrationExecutor, MigrationPlan, MigrationState, MigrationStatus,
    MigrationStep,
};
pub use loader::{MemorySource, MigrationLoader, MigrationSource};
pub use recorder::{AppliedMigration, MigrationRecorder};
pub use script::{MarkerParser, ParsedScript, ScriptParser};
pub use template::{dashify, MigrationTemplate, TemplateKind};
