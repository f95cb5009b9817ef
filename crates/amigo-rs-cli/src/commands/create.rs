//! The `create` command.
//!
//! Writes a timestamped migration skeleton into the migrations directory.
//! Slugs mentioning `table` get a placeholder `create table` body.

use amigo_rs_core::{AmigoResult, Settings};
use amigo_rs_migrations::template::DEFAULT_SLUG;
use amigo_rs_migrations::{MigrationTemplate, TemplateKind};
use async_trait::async_trait;

use crate::command::ManagementCommand;

/// Generates a new migration file.
pub struct CreateCommand;

#[async_trait]
impl ManagementCommand for CreateCommand {
    fn name(&self) -> &'static str {
        "create"
    }

    fn help(&self) -> &'static str {
        "Create a new migration file"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("name")
                .help("Migration slug; spaces become underscores")
                .default_value(DEFAULT_SLUG),
        )
        .arg(
            clap::Arg::new("dry-run")
                .long("dry-run")
                .action(clap::ArgAction::SetTrue)
                .help("Print the file name and content without writing"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> AmigoResult<()> {
        let slug = matches
            .get_one::<String>("name")
            .map_or(DEFAULT_SLUG, String::as_str);
        let template = MigrationTemplate::generate(TemplateKind::infer(slug), slug, chrono::Utc::now());

        if matches.get_flag("dry-run") {
            println!("{}\n{}", template.file_name, template.content);
            return Ok(());
        }

        let path = template.write_to(&settings.migrations.path)?;
        println!("{}", path.display());
        Ok(())
    }
}
