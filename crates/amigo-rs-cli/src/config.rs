//! Global options and settings resolution.
//!
//! Settings are layered: defaults, then a TOML file (`--config`, or
//! `amigo.toml` in the working directory when present), then the
//! environment, then `--path` and `--table` on the command line.

use std::path::{Path, PathBuf};

use amigo_rs_core::settings_loader;
use amigo_rs_core::{AmigoResult, Settings};

/// The configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "amigo.toml";

/// Adds the options shared by every subcommand.
pub fn global_arguments(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        clap::Arg::new("path")
            .long("path")
            .global(true)
            .value_parser(clap::value_parser!(PathBuf))
            .help("migrations path relative to current directory"),
    )
    .arg(
        clap::Arg::new("config")
            .long("config")
            .global(true)
            .value_parser(clap::value_parser!(PathBuf))
            .help("TOML settings file (defaults to ./amigo.toml when present)"),
    )
    .arg(
        clap::Arg::new("table")
            .long("table")
            .global(true)
            .help("Name of the migrations bookkeeping table"),
    )
}

/// Resolves settings for an invocation from the process environment.
pub fn resolve_settings(matches: &clap::ArgMatches) -> AmigoResult<Settings> {
    let cwd = std::env::current_dir()?;
    resolve_settings_with(matches, &cwd, |key| std::env::var(key).ok())
}

/// Resolves settings relative to `cwd` with a custom variable lookup.
pub fn resolve_settings_with<F>(
    matches: &clap::ArgMatches,
    cwd: &Path,
    lookup: F,
) -> AmigoResult<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let config_file = match matches.get_one::<PathBuf>("config") {
        Some(path) => Some(path.clone()),
        None => {
            let candidate = cwd.join(DEFAULT_CONFIG_FILE);
            candidate.is_file().then_some(candidate)
        }
    };

    let mut settings = match config_file {
        Some(path) => {
            tracing::debug!("Loading settings from {}", path.display());
            settings_loader::from_toml_file(path)?
        }
        None => Settings::default(),
    };

    settings_loader::apply_overrides_from(&mut settings, lookup)?;

    if let Some(path) = matches.get_one::<PathBuf>("path") {
        settings.migrations.path.clone_from(path);
    }
    if let Some(table) = matches.get_one::<String>("table") {
        settings.migrations.table.clone_from(table);
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use amigo_rs_core::AmigoError;
    use std::collections::HashMap;

    fn cli() -> clap::Command {
        global_arguments(clap::Command::new("amigo"))
            .subcommand(clap::Command::new("up"))
    }

    fn resolve(args: &[&str], cwd: &Path, env: &[(&str, &str)]) -> AmigoResult<Settings> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let matches = cli().try_get_matches_from(args).unwrap();
        resolve_settings_with(&matches, cwd, |key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let dir = tempfile::tempdir().unwrap();
        let settings = resolve(&["amigo", "up"], dir.path(), &[]).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_amigo_toml_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[database]\ndriver = \"sqlite\"\nurl = \"app.db\"\n",
        )
        .unwrap();

        let settings = resolve(&["amigo", "up"], dir.path(), &[]).unwrap();
        assert_eq!(settings.database.driver, "sqlite");
        assert_eq!(settings.database.url, "app.db");
        assert_eq!(settings.migrations.table, "amigo_migrations");
    }

    #[test]
    fn test_explicit_config_env_and_flags_layer_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.toml");
        std::fs::write(
            &file,
            "[database]\ndriver = \"sqlite\"\nurl = \"from-file.db\"\n\n[migrations]\ntable = \"from_file\"\npath = \"file/migrations\"\n",
        )
        .unwrap();
        let config = file.to_string_lossy().into_owned();

        let settings = resolve(
            &["amigo", "--config", &config, "up", "--table", "from_flag"],
            dir.path(),
            &[("DB_QUERY", "from-env.db"), ("AMIGO_MIGRATIONS_PATH", "env/migrations")],
        )
        .unwrap();
        assert_eq!(settings.database.driver, "sqlite");
        assert_eq!(settings.database.url, "from-env.db");
        assert_eq!(settings.migrations.path, PathBuf::from("env/migrations"));
        assert_eq!(settings.migrations.table, "from_flag");
    }

    #[test]
    fn test_path_flag_wins_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let settings = resolve(
            &["amigo", "up", "--path", "db/migrations"],
            dir.path(),
            &[("AMIGO_MIGRATIONS_PATH", "env/migrations")],
        )
        .unwrap();
        assert_eq!(settings.migrations.path, PathBuf::from("db/migrations"));
    }

    #[test]
    fn test_missing_config_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(&["amigo", "--config", "/no/such/amigo.toml", "up"], dir.path(), &[])
            .unwrap_err();
        assert!(matches!(err, AmigoError::ConfigurationError(_)));
    }
}
