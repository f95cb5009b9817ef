//! # amigo-rs-db
//!
//! The database layer shared by the drivers and the migration engine. It
//! defines what a connection can do without depending on any driver.
//!
//! ## Module Overview
//!
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum
//! - [`row`] - [`Row`](row::Row) and typed column access via [`FromValue`](row::FromValue)
//! - [`executor`] - The [`DbExecutor`](executor::DbExecutor) trait
//! - [`transactions`] - `atomic()` blocks and isolation levels

// - doc_markdown: backtick requirements for documentation items are too strict
// - missing_const_for_fn: several accessors may grow non-const bodies
// - significant_drop_tightening: false positives with async Mutex guards
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::use_self)]

pub mod executor;
pub mod row;
pub mod transactions;
pub mod value;

pub use executor::{DatabaseBackendType, DbExecutor};
pub use row::{FromValue, Row};
pub use transactions::{atomic, atomic_with_isolation, IsolationLevel, TransactionManager};
pub use value::Value;
