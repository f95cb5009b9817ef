//! Command framework for amigo-rs.
//!
//! This module provides the [`ManagementCommand`] trait for defining CLI commands
//! and [`CommandRegistry`] for registering and dispatching them.
//!
//! ## Defining a Custom Command
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use amigo_rs_cli::command::ManagementCommand;
//! use amigo_rs_core::{AmigoResult, Settings};
//!
//! struct GreetCommand;
//!
//! #[async_trait]
//! impl ManagementCommand for GreetCommand {
//!     fn name(&self) -> &'static str { "greet" }
//!     fn help(&self) -> &'static str { "Say hello" }
//!
//!     async fn handle(
//!         &self,
//!         _matches: &clap::ArgMatches,
//!         _settings: &Settings,
//!     ) -> AmigoResult<()> {
//!         println!("Hello from amigo!");
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::HashMap;

use amigo_rs_core::{AmigoError, AmigoResult, Settings};
use async_trait::async_trait;

use crate::config::global_arguments;

/// A command that can be registered and invoked through the CLI.
///
/// Implementations define a name, help text, optional arguments, and an
/// async handler. All commands must be `Send + Sync`.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// Returns the name of this command (used to invoke it from the CLI).
    fn name(&self) -> &'static str;

    /// Returns a short help description for this command.
    fn help(&self) -> &'static str;

    /// Adds custom arguments to the clap command.
    ///
    /// The default implementation returns the command unchanged.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Executes the command with the given argument matches and settings.
    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> AmigoResult<()>;
}

/// A registry of commands.
///
/// Commands are registered by name and can be looked up, listed, or executed.
/// One command may be marked as the default; it runs when the binary is
/// invoked without a subcommand.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn ManagementCommand>>,
    default_command: Option<&'static str>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Creates a new empty command registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            default_command: None,
        }
    }

    /// Registers a command.
    ///
    /// If a command with the same name already exists, it is replaced.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name(), command);
    }

    /// Marks the command run when no subcommand is given.
    pub fn set_default(&mut self, name: &'static str) {
        self.default_command = Some(name);
    }

    /// Returns the default command's name, if any.
    pub fn default_command(&self) -> Option<&'static str> {
        self.default_command
    }

    /// Returns a reference to the command with the given name, if registered.
    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Returns a sorted list of all registered command names.
    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the top-level clap `Command` with every registered subcommand
    /// and the global options.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("amigo")
            .about("Versioned SQL migrations")
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_required(self.default_command.is_none());
        app = global_arguments(app);

        for name in self.list_commands() {
            if let Some(cmd) = self.commands.get(name) {
                app = app.subcommand(Self::subcommand(cmd.as_ref()));
            }
        }

        app
    }

    fn subcommand(cmd: &dyn ManagementCommand) -> clap::Command {
        cmd.add_arguments(clap::Command::new(cmd.name()).about(cmd.help()))
    }

    /// Executes the command identified by the given argument matches.
    ///
    /// Without a subcommand the default command runs with its own defaults.
    pub async fn execute(&self, matches: &clap::ArgMatches, settings: &Settings) -> AmigoResult<()> {
        if let Some((name, sub_matches)) = matches.subcommand() {
            let cmd = self
                .get(name)
                .ok_or_else(|| AmigoError::ConfigurationError(format!("Unknown command: {name}")))?;
            return cmd.handle(sub_matches, settings).await;
        }

        let name = self
            .default_command
            .ok_or_else(|| AmigoError::ConfigurationError("No subcommand specified".to_string()))?;
        let cmd = self
            .get(name)
            .ok_or_else(|| AmigoError::ConfigurationError(format!("Unknown command: {name}")))?;
        let defaults = Self::subcommand(cmd)
            .try_get_matches_from([name])
            .map_err(|e| AmigoError::ConfigurationError(e.to_string()))?;
        cmd.handle(&defaults, settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TestCommand {
        cmd_name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl TestCommand {
        fn new(name: &'static str) -> Self {
            Self {
                cmd_name: name,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ManagementCommand for TestCommand {
        fn name(&self) -> &'static str {
            self.cmd_name
        }

        fn help(&self) -> &'static str {
            "A test command"
        }

        fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
            cmd.arg(
                clap::Arg::new("verbose")
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue),
            )
        }

        async fn handle(&self, _matches: &clap::ArgMatches, _settings: &Settings) -> AmigoResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingCommand;

    #[async_trait]
    impl ManagementCommand for FailingCommand {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn help(&self) -> &'static str {
            "A command that always fails"
        }

        async fn handle(&self, _matches: &clap::ArgMatches, _settings: &Settings) -> AmigoResult<()> {
            Err(AmigoError::ConfigurationError("deliberate failure".to_string()))
        }
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.default_command().is_none());
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("test")));
        assert_eq!(registry.len(), 1);

        let cmd = registry.get("test").unwrap();
        assert_eq!(cmd.name(), "test");
        assert_eq!(cmd.help(), "A test command");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_list_commands_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("up")));
        registry.register(Box::new(TestCommand::new("create")));
        registry.register(Box::new(TestCommand::new("down")));
        assert_eq!(registry.list_commands(), vec!["create", "down", "up"]);
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("test")));
        registry.register(Box::new(TestCommand::new("test")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_build_cli_with_arguments() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("test")));

        let matches = registry
            .build_cli()
            .try_get_matches_from(["amigo", "test", "--verbose"])
            .unwrap();
        let (name, sub_matches) = matches.subcommand().unwrap();
        assert_eq!(name, "test");
        assert!(sub_matches.get_flag("verbose"));
    }

    #[test]
    fn test_subcommand_required_without_default() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("test")));
        assert!(registry.build_cli().try_get_matches_from(["amigo"]).is_err());

        registry.set_default("test");
        assert!(registry.build_cli().try_get_matches_from(["amigo"]).is_ok());
    }

    #[tokio::test]
    async fn test_execute_success() {
        let mut registry = CommandRegistry::new();
        let cmd = TestCommand::new("test");
        let calls = Arc::clone(&cmd.calls);
        registry.register(Box::new(cmd));

        let matches = registry
            .build_cli()
            .try_get_matches_from(["amigo", "test"])
            .unwrap();
        registry.execute(&matches, &Settings::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_default_command() {
        let mut registry = CommandRegistry::new();
        let cmd = TestCommand::new("create");
        let calls = Arc::clone(&cmd.calls);
        registry.register(Box::new(cmd));
        registry.set_default("create");

        let matches = registry.build_cli().try_get_matches_from(["amigo"]).unwrap();
        registry.execute(&matches, &Settings::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(FailingCommand));

        let matches = registry
            .build_cli()
            .try_get_matches_from(["amigo", "fail"])
            .unwrap();
        let err = registry
            .execute(&matches, &Settings::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
