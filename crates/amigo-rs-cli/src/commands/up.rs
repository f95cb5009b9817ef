//! The `up` command.

use amigo_rs_core::{AmigoResult, Settings};
use async_trait::async_trait;

use super::Migrator;
use crate::command::ManagementCommand;

/// Applies every pending migration in one transaction.
pub struct UpCommand;

#[async_trait]
impl ManagementCommand for UpCommand {
    fn name(&self) -> &'static str {
        "up"
    }

    fn help(&self) -> &'static str {
        "Apply all pending migrations"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> AmigoResult<()> {
        let m = Migrator::open(settings).await?;
        let applied = m.executor.apply_pending(&m.loader, m.db.as_ref()).await?;
        tracing::info!("Applied {} migration(s)", applied.len());
        Ok(())
    }
}
