//! Connection configuration and driver selection.
//!
//! [`DatabaseConfig`] names a backend and a connection string; [`connect`]
//! opens the matching driver and hands it back as a boxed
//! [`DbExecutor`]. Drivers are compiled in through cargo features, so a
//! build without, say, `mysql` reports a configuration error instead of
//! failing to link.

use amigo_rs_core::{AmigoError, AmigoResult};
use amigo_rs_db::{DatabaseBackendType, DbExecutor};

/// Configuration for connecting to a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// The backend type.
    pub backend: DatabaseBackendType,
    /// The driver-specific connection string.
    ///
    /// SQLite accepts a file path, `:memory:`, or a `sqlite://` URL.
    /// PostgreSQL accepts a `postgres://` URL or a `key=value` string.
    /// MySQL accepts a `mysql://` URL.
    pub url: String,
}

impl DatabaseConfig {
    /// Builds a configuration from a driver identifier and connection string.
    ///
    /// # Errors
    ///
    /// Returns [`AmigoError::ImproperlyConfigured`] for an unknown driver.
    pub fn from_driver(driver: &str, url: impl Into<String>) -> AmigoResult<Self> {
        Ok(Self {
            backend: DatabaseBackendType::from_driver(driver)?,
            url: url.into(),
        })
    }

    /// Creates a configuration for an in-memory SQLite database.
    pub fn sqlite_memory() -> Self {
        Self {
            backend: DatabaseBackendType::SQLite,
            url: ":memory:".to_string(),
        }
    }

    /// Creates a configuration for a SQLite file database.
    pub fn sqlite_file(path: impl Into<String>) -> Self {
        Self {
            backend: DatabaseBackendType::SQLite,
            url: path.into(),
        }
    }

    /// Creates a configuration for a PostgreSQL database.
    pub fn postgres(url: impl Into<String>) -> Self {
        Self {
            backend: DatabaseBackendType::PostgreSQL,
            url: url.into(),
        }
    }

    /// Creates a configuration for a MySQL database.
    pub fn mysql(url: impl Into<String>) -> Self {
        Self {
            backend: DatabaseBackendType::MySQL,
            url: url.into(),
        }
    }
}

/// Opens a connection for the given configuration.
///
/// # Errors
///
/// Returns [`AmigoError::ImproperlyConfigured`] when the connection string is
/// empty or the driver was not compiled in, and
/// [`AmigoError::OperationalError`] when the connection cannot be
/// established.
pub async fn connect(config: &DatabaseConfig) -> AmigoResult<Box<dyn DbExecutor>> {
    if config.url.trim().is_empty() {
        return Err(AmigoError::ImproperlyConfigured(format!(
            "No connection string configured for {} (set AMIGO_DB_QUERY or DB_QUERY)",
            config.backend
        )));
    }

    tracing::debug!(backend = %config.backend, "opening database connection");

    match config.backend {
        DatabaseBackendType::SQLite => connect_sqlite(config),
        DatabaseBackendType::PostgreSQL => connect_postgres(config).await,
        DatabaseBackendType::MySQL => connect_mysql(config).await,
    }
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(config: &DatabaseConfig) -> AmigoResult<Box<dyn DbExecutor>> {
    Ok(Box::new(crate::sqlite::SqliteBackend::from_url(&config.url)?))
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(config: &DatabaseConfig) -> AmigoResult<Box<dyn DbExecutor>> {
    Err(not_compiled_in(config.backend, "sqlite"))
}

#[cfg(feature = "postgres")]
async fn connect_postgres(config: &DatabaseConfig) -> AmigoResult<Box<dyn DbExecutor>> {
    Ok(Box::new(
        crate::postgresql::PostgresBackend::connect(&config.url).await?,
    ))
}

#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
async fn connect_postgres(config: &DatabaseConfig) -> AmigoResult<Box<dyn DbExecutor>> {
    Err(not_compiled_in(config.backend, "postgres"))
}

#[cfg(feature = "mysql")]
async fn connect_mysql(config: &DatabaseConfig) -> AmigoResult<Box<dyn DbExecutor>> {
    Ok(Box::new(
        crate::mysql::MySqlBackend::connect(&config.url).await?,
    ))
}

#[cfg(not(feature = "mysql"))]
#[allow(clippy::unused_async)]
async fn connect_mysql(config: &DatabaseConfig) -> AmigoResult<Box<dyn DbExecutor>> {
    Err(not_compiled_in(config.backend, "mysql"))
}

#[cfg(any(not(feature = "sqlite"), not(feature = "postgres"), not(feature = "mysql")))]
fn not_compiled_in(backend: DatabaseBackendType, feature: &str) -> AmigoError {
    AmigoError::ImproperlyConfigured(format!(
        "Support for {backend} was not compiled in (enable the '{feature}' feature)"
    ))
}
