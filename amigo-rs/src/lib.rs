//! # amigo-rs
//!
//! Versioned SQL migrations with up/down scripts.
//!
//! This is the meta-crate that re-exports the sub-crates and ships the
//! `amigo` binary. Depend on it for everything, or on individual crates for
//! finer-grained control.
//!
//! ```rust
//! use amigo_rs::migrations::{MarkerParser, ScriptParser};
//!
//! let parsed = MarkerParser::new().parse(
//!     "/* -- migrate_up -- */\ncreate table users(id int);\n/* -- migrate_down -- */\ndrop table users;",
//! );
//! assert_eq!(parsed.up, "create table users(id int);");
//! assert_eq!(parsed.down, "drop table users;");
//! ```

/// Error type, settings, and logging.
pub use amigo_rs_core as core;

/// Values, rows, the executor trait, and transactions.
pub use amigo_rs_db as db;

/// Database drivers: `PostgreSQL`, `MySQL`, `SQLite`.
pub use amigo_rs_db_backends as db_backends;

/// The migration engine.
pub use amigo_rs_migrations as migrations;

/// Commands (CLI).
pub use amigo_rs_cli as cli;
