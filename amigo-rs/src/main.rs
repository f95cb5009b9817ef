//! The `amigo` command-line tool.
//!
//! ```text
//! amigo [--path DIR] [--config FILE] [--table NAME] <create [name] | up | down | rollback [steps] | status>
//! ```
//!
//! The database is chosen with `DB_DRIVER` and `DB_QUERY` (or their
//! `AMIGO_`-prefixed forms, or an `amigo.toml`). Without a subcommand,
//! `amigo` creates a new migration named `some`.

use amigo_rs_cli::command::CommandRegistry;
use amigo_rs_cli::commands::register_builtin_commands;
use amigo_rs_cli::resolve_settings;
use amigo_rs_core::logging::setup_logging;
use amigo_rs_core::{AmigoError, Settings};
use anyhow::Context;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("{err:#}");
        let code = err
            .downcast_ref::<AmigoError>()
            .map_or(1, AmigoError::exit_code);
        std::process::exit(code);
    }
}

async fn run() -> anyhow::Result<()> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let matches = registry.build_cli().get_matches();
    let settings = match resolve_settings(&matches) {
        Ok(settings) => settings,
        Err(e) => {
            setup_logging(&Settings::default());
            return Err(e).context("could not load settings");
        }
    };
    setup_logging(&settings);

    let command = matches
        .subcommand_name()
        .or(registry.default_command())
        .unwrap_or_default();
    registry
        .execute(&matches, &settings)
        .await
        .with_context(|| format!("amigo {command} failed"))
}
