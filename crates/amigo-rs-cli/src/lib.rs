//! # amigo-rs-cli
//!
//! The command-line surface of amigo-rs.
//!
//! This crate provides:
//!
//! - **Command framework** - [`ManagementCommand`] and [`CommandRegistry`]
//! - **Built-in commands** - `create`, `up`, `down`, `rollback`, `status`
//! - **Settings resolution** - defaults, TOML file, environment, then flags
//!
//! ## Quick Start
//!
//! ```rust
//! use amigo_rs_cli::command::CommandRegistry;
//! use amigo_rs_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert_eq!(names, vec!["create", "down", "rollback", "status", "up"]);
//! assert_eq!(registry.default_command(), Some("create"));
//! ```

// - doc_markdown: backtick requirements for documentation items are too strict
// - missing_const_for_fn: some functions may gain runtime logic later
// - unused_async: command handlers keep a uniform async signature
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::unused_async)]
#![allow(clippy::future_not_send)]

pub mod command;
pub mod commands;
pub mod config;

pub use command::{CommandRegistry, ManagementCommand};
pub use config::{resolve_settings, resolve_settings_with};
