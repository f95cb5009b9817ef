//! Core error types for amigo-rs.
//!
//! This module provides the [`AmigoError`] enum shared by every crate in the
//! workspace. Database drivers, the migration engine, and the settings loader
//! all report failures through it, and the binary maps each variant to a
//! process exit code via [`AmigoError::exit_code`].

use thiserror::Error;

/// The primary error type for amigo-rs.
///
/// Variants are grouped by the layer that raises them. Nothing in the library
/// crates terminates the process; the caller decides what to do with the error.
#[derive(Error, Debug)]
pub enum AmigoError {
    // ── Database errors ──────────────────────────────────────────────

    /// A generic database error (statement failed, bad bind, etc.).
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A database integrity constraint was violated.
    ///
    /// Two migrators racing to record the same migration name end up here.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Migration errors ─────────────────────────────────────────────

    /// A migration could not be applied or reverted.
    #[error("Migration '{name}' failed: {source}")]
    MigrationError {
        /// The migration file name.
        name: String,
        /// The underlying failure.
        #[source]
        source: Box<AmigoError>,
    },

    /// A ledger entry refers to a migration file that is not on disk.
    #[error("Migration script not found: {0}")]
    ScriptNotFound(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The tool is improperly configured (e.g. unknown database driver).
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AmigoError {
    /// Wraps an error with the name of the migration that produced it.
    pub fn in_migration(name: impl Into<String>, source: Self) -> Self {
        Self::MigrationError {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Returns the process exit code associated with this error.
    ///
    /// - `ConfigurationError`, `ImproperlyConfigured` -> 2
    /// - Everything else -> 1
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigurationError(_) | Self::ImproperlyConfigured(_) => 2,
            Self::MigrationError { source, .. } => source.exit_code(),
            Self::DatabaseError(_)
            | Self::IntegrityError(_)
            | Self::OperationalError(_)
            | Self::ScriptNotFound(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 1,
        }
    }

    /// Returns `true` if this error (or the error it wraps) is an integrity
    /// violation.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Self::IntegrityError(_) => true,
            Self::MigrationError { source, .. } => source.is_integrity_error(),
            _ => false,
        }
    }
}

/// A convenience type alias for `Result<T, AmigoError>`.
pub type AmigoResult<T> = Result<T, AmigoError>;
