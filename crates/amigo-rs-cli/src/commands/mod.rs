//! Built-in commands.
//!
//! `create` writes a new migration skeleton; `up`, `down` and `rollback`
//! drive the migration engine; `status` reports where each file stands.

pub mod create;
pub mod down;
pub mod rollback;
pub mod status;
pub mod up;

pub use create::CreateCommand;
pub use down::DownCommand;
pub use rollback::RollbackCommand;
pub use status::StatusCommand;
pub use up::UpCommand;

use amigo_rs_core::{AmigoResult, Settings};
use amigo_rs_db::DbExecutor;
use amigo_rs_db_backends::{connect, DatabaseConfig};
use amigo_rs_migrations::{MigrationConfig, MigrationExecutor, MigrationLoader};

use crate::command::CommandRegistry;

/// Registers all built-in commands and makes `create` the default.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(CreateCommand));
    registry.register(Box::new(UpCommand));
    registry.register(Box::new(DownCommand));
    registry.register(Box::new(RollbackCommand));
    registry.register(Box::new(StatusCommand));
    registry.set_default("create");
}

/// The pieces every engine-driving command needs.
pub(crate) struct Migrator {
    pub executor: MigrationExecutor,
    pub loader: MigrationLoader,
    pub db: Box<dyn DbExecutor>,
}

impl Migrator {
    /// Validates the settings, then connects.
    ///
    /// Driver, table name and isolation level are all checked before a
    /// connection is attempted.
    pub async fn open(settings: &Settings) -> AmigoResult<Self> {
        let db_config =
            DatabaseConfig::from_driver(&settings.database.driver, settings.database.url.clone())?;

        let mut config = MigrationConfig::for_backend(db_config.backend)
            .with_table_name(settings.migrations.table.clone());
        if let Some(level) = &settings.migrations.isolation_level {
            config = config.with_isolation_level(level.parse()?);
        }
        let executor = MigrationExecutor::new(config)?;

        tracing::debug!("Connecting to {} database", db_config.backend);
        let db = connect(&db_config).await?;

        Ok(Self {
            executor,
            loader: MigrationLoader::new(&settings.migrations.path),
            db,
        })
    }
}
