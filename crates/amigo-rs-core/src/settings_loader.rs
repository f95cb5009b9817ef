//! Settings loading from configuration files and the environment.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! Command-line flags are layered on top by the CLI crate.
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `AMIGO_DB_DRIVER` or `DB_DRIVER` | `database.driver` |
//! | `AMIGO_DB_QUERY` or `DB_QUERY` | `database.url` |
//! | `AMIGO_MIGRATIONS_PATH` | `migrations.path` |
//! | `AMIGO_MIGRATIONS_TABLE` | `migrations.table` |
//! | `AMIGO_ISOLATION_LEVEL` | `migrations.isolation_level` |
//! | `AMIGO_LOG_LEVEL` | `log_level` |
//! | `AMIGO_LOG_FORMAT` | `log_format` |
//! | `AMIGO_DEBUG` | `debug` |
//!
//! The `AMIGO_`-prefixed name wins when both forms are set. Empty values are
//! ignored.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use amigo_rs_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("amigo.toml").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::AmigoError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, AmigoError> {
    // Deserialize into a generic value first and merge it over the defaults,
    // so partial files (e.g. only `[database]`) are accepted.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| AmigoError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    let json_value = toml_to_json(toml_value);
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        AmigoError::SerializationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, json_value);
    serde_json::from_value(merged).map_err(|e| {
        AmigoError::ConfigurationError(format!("Failed to deserialize settings from TOML: {e}"))
    })
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, AmigoError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        AmigoError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, AmigoError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
///
/// # Errors
///
/// Returns an error if an environment variable holds an unparsable value.
pub fn from_env() -> Result<Settings, AmigoError> {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Applies process environment overrides to a settings struct.
///
/// # Errors
///
/// Returns an error if `AMIGO_LOG_FORMAT` holds an unknown format.
pub fn apply_env_overrides(settings: &mut Settings) -> Result<(), AmigoError> {
    apply_overrides_from(settings, |key| std::env::var(key).ok())
}

/// Applies overrides using an arbitrary variable lookup.
///
/// This is the implementation behind [`apply_env_overrides`]; tests and
/// embedders can feed it a map instead of the process environment.
///
/// # Errors
///
/// Returns an error if the log format value is unknown.
pub fn apply_overrides_from<F>(settings: &mut Settings, lookup: F) -> Result<(), AmigoError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(name))
            .find(|val| !val.is_empty())
    };

    if let Some(val) = var(&["AMIGO_DB_DRIVER", "DB_DRIVER"]) {
        settings.database.driver = val;
    }

    if let Some(val) = var(&["AMIGO_DB_QUERY", "DB_QUERY"]) {
        settings.database.url = val;
    }

    if let Some(val) = var(&["AMIGO_MIGRATIONS_PATH"]) {
        settings.migrations.path = PathBuf::from(val);
    }

    if let Some(val) = var(&["AMIGO_MIGRATIONS_TABLE"]) {
        settings.migrations.table = val;
    }

    if let Some(val) = var(&["AMIGO_ISOLATION_LEVEL"]) {
        settings.migrations.isolation_level = Some(val);
    }

    if let Some(val) = var(&["AMIGO_LOG_LEVEL"]) {
        settings.log_level = val;
    }

    if let Some(val) = var(&["AMIGO_LOG_FORMAT"]) {
        settings.log_format = val
            .parse()
            .map_err(|e: String| AmigoError::ConfigurationError(e))?;
    }

    if let Some(val) = var(&["AMIGO_DEBUG"]) {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    Ok(())
}

// ============================================================
// Helpers
// ============================================================

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
