//! The `down` command.

use amigo_rs_core::{AmigoResult, Settings};
use async_trait::async_trait;

use super::Migrator;
use crate::command::ManagementCommand;

/// Reverts every applied migration, newest first, in one transaction.
pub struct DownCommand;

#[async_trait]
impl ManagementCommand for DownCommand {
    fn name(&self) -> &'static str {
        "down"
    }

    fn help(&self) -> &'static str {
        "Revert all applied migrations"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> AmigoResult<()> {
        let m = Migrator::open(settings).await?;
        let reverted = m.executor.revert_all(&m.loader, m.db.as_ref()).await?;
        tracing::info!("Rolled back {} migration(s)", reverted.len());
        Ok(())
    }
}
