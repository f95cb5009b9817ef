//! Logging integration for amigo-rs.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-migration spans.

use crate::settings::{LogFormat, Settings};

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug", "info",
/// "amigo_rs_migrations=trace"); an unparsable directive falls back to
/// "info". `settings.log_format` selects between compact text and JSON
/// lines. Debug mode adds the source file and line of each event.
///
/// Events are written to stderr so that command output on stdout stays
/// machine-readable. Installing a subscriber twice is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match settings.log_format {
        LogFormat::Text => {
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(settings.debug)
                .with_file(settings.debug)
                .with_line_number(settings.debug)
                .compact()
                .try_init()
                .ok();
        }
        LogFormat::Json => {
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(settings.debug)
                .with_line_number(settings.debug)
                .json()
                .try_init()
                .ok();
        }
    }
}

/// Creates a tracing span for a single migration step.
///
/// `direction` is `"up"` or `"down"`. Every event emitted while the span is
/// entered carries the migration name.
///
/// # Examples
///
/// ```
/// use amigo_rs_core::logging::migration_span;
///
/// let span = migration_span("2024_01_01_00_00_00_create_users.sql", "up");
/// let _guard = span.enter();
/// tracing::info!("applying");
/// ```
pub fn migration_span(name: &str, direction: &'static str) -> tracing::Span {
    tracing::info_span!("migration", name = name, direction = direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = Settings {
            log_level: "not a [valid directive".to_string(),
            ..Settings::default()
        };
        setup_logging(&settings);
        setup_logging(&Settings {
            log_format: LogFormat::Json,
            ..Settings::default()
        });
    }

    #[test]
    fn test_migration_span() {
        let span = migration_span("a.sql", "down");
        let _guard = span.enter();
        tracing::info!("inside span");
    }
}
