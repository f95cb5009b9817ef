//! The `rollback` command.
//!
//! Reverts the newest `steps` migrations (one by default).

use amigo_rs_core::{AmigoError, AmigoResult, Settings};
use async_trait::async_trait;

use super::Migrator;
use crate::command::ManagementCommand;

/// Reverts the most recent migrations.
pub struct RollbackCommand;

/// Parses the step count argument. It must be a positive integer.
pub fn parse_steps(raw: &str) -> AmigoResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(AmigoError::ConfigurationError(
            "rollback steps must be at least 1".to_string(),
        )),
        Ok(steps) => Ok(steps),
        Err(e) => Err(AmigoError::ConfigurationError(format!(
            "invalid rollback steps '{raw}': {e}"
        ))),
    }
}

#[async_trait]
impl ManagementCommand for RollbackCommand {
    fn name(&self) -> &'static str {
        "rollback"
    }

    fn help(&self) -> &'static str {
        "Revert the most recent migrations"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("steps")
                .help("How many migrations to revert")
                .default_value("1"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> AmigoResult<()> {
        let raw = matches.get_one::<String>("steps").map_or("1", String::as_str);
        let steps = parse_steps(raw)?;

        let m = Migrator::open(settings).await?;
        let reverted = m.executor.revert_steps(&m.loader, m.db.as_ref(), steps).await?;
        tracing::info!("Rolled back {} migration(s)", reverted.len());
        Ok(())
    }
}
