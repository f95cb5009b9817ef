//! Settings for amigo-rs.
//!
//! This module provides the [`Settings`] struct, which holds every knob the
//! command-line tool understands. Settings are plain values: they are loaded
//! once (see [`settings_loader`](crate::settings_loader)) and passed down
//! explicitly. There is no process-wide settings instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Database connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The driver identifier (e.g. `mysql`, `postgres`, `sqlite3`).
    pub driver: String,
    /// The driver-specific connection string.
    ///
    /// A file path (or `:memory:`) for SQLite, a `postgres://` URL or
    /// `key=value` string for PostgreSQL, a `mysql://` URL for MySQL.
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            driver: "mysql".to_string(),
            url: String::new(),
        }
    }
}

/// Migration engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSettings {
    /// Directory containing the migration files.
    pub path: PathBuf,
    /// Name of the bookkeeping table.
    pub table: String,
    /// Optional transaction isolation level (e.g. `serializable`).
    pub isolation_level: Option<String>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("migrations"),
            table: "amigo_migrations".to_string(),
            isolation_level: None,
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact, human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// The complete set of settings.
///
/// # Examples
///
/// ```
/// use amigo_rs_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.debug);
/// assert_eq!(settings.migrations.table, "amigo_migrations");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug output (file and line of each event) is enabled.
    pub debug: bool,
    /// The log level or `EnvFilter` directive (e.g. "info", "amigo_rs=debug").
    pub log_level: String,
    /// The log output format.
    pub log_format: LogFormat,
    /// Database connection settings.
    pub database: DatabaseSettings,
    /// Migration engine settings.
    pub migrations: MigrationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database: DatabaseSettings::default(),
            migrations: MigrationSettings::default(),
        }
    }
}
