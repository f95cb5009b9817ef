//! # amigo-rs-core
//!
//! Core types shared by every amigo-rs crate: the error enum, the settings
//! struct and its loader, and tracing setup.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Tool settings
//! - [`settings_loader`] - TOML and environment loading
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{AmigoError, AmigoResult};
pub use settings::Settings;
