//! # amigo-rs-db-backends
//!
//! Database drivers for amigo-rs. Each driver implements
//! [`DbExecutor`](amigo_rs_db::DbExecutor) over a single connection.
//!
//! Supported backends (each behind a cargo feature of the same name):
//! - `sqlite` via `rusqlite`
//! - `postgres` via `tokio-postgres` and `deadpool-postgres`
//! - `mysql` via `mysql_async`

#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::significant_drop_tightening)]

pub mod base;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgresql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use base::{connect, DatabaseConfig};
#[cfg(feature = "mysql")]
pub use mysql::MySqlBackend;
#[cfg(feature = "postgres")]
pub use postgresql::PostgresBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
