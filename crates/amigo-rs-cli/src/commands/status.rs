//! The `status` command.
//!
//! Lists every migration file with a marker showing whether it is applied,
//! followed by ledger entries whose file is gone:
//!
//! ```text
//!  [X] 2024_01_01_00_00_00_create_users_table.sql (priority 0)
//!  [ ] 2024_01_02_00_00_00_create_some.sql
//!  [?] 2024_01_03_00_00_00_create_moved.sql (recorded at priority 4)
//!  [!] 2023_12_31_00_00_00_create_old.sql (missing file, priority 1)
//! ```

use std::fmt::Write;

use amigo_rs_core::{AmigoResult, Settings};
use amigo_rs_migrations::{MigrationState, MigrationStatus};
use async_trait::async_trait;

use super::Migrator;
use crate::command::ManagementCommand;

/// Shows which migrations are applied.
pub struct StatusCommand;

/// Renders a status report, one line per entry.
pub fn render_status(report: &[MigrationStatus]) -> String {
    if report.is_empty() {
        return " (no migrations)\n".to_string();
    }

    let mut out = String::new();
    for status in report {
        let priority = status.priority.unwrap_or_default();
        let _ = match status.state {
            MigrationState::Applied => {
                writeln!(out, " [X] {} (priority {priority})", status.name)
            }
            MigrationState::Pending => writeln!(out, " [ ] {}", status.name),
            MigrationState::Diverged => writeln!(
                out,
                " [?] {} (recorded at priority {priority})",
                status.name
            ),
            MigrationState::Missing => writeln!(
                out,
                " [!] {} (missing file, priority {priority})",
                status.name
            ),
        };
    }
    out
}

#[async_trait]
impl ManagementCommand for StatusCommand {
    fn name(&self) -> &'static str {
        "status"
    }

    fn help(&self) -> &'static str {
        "Show which migrations are applied"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> AmigoResult<()> {
        let m = Migrator::open(settings).await?;
        let report = m.executor.status(&m.loader, m.db.as_ref()).await?;

        let diverged = report
            .iter()
            .filter(|s| matches!(s.state, MigrationState::Diverged | MigrationState::Missing))
            .count();
        if diverged > 0 {
            tracing::warn!("{diverged} migration(s) out of step with the ledger");
        }

        print!("{}", render_status(&report));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(name: &str, state: MigrationState, priority: Option<i64>) -> MigrationStatus {
        MigrationStatus {
            name: name.into(),
            state,
            priority,
            applied_at: None,
        }
    }

    #[test]
    fn test_render_status() {
        let out = render_status(&[
            status("a.sql", MigrationState::Applied, Some(0)),
            status("b.sql", MigrationState::Pending, None),
            status("c.sql", MigrationState::Diverged, Some(3)),
            status("old.sql", MigrationState::Missing, Some(1)),
        ]);
        assert_eq!(
            out,
            " [X] a.sql (priority 0)\n [ ] b.sql\n [?] c.sql (recorded at priority 3)\n [!] old.sql (missing file, priority 1)\n"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_status(&[]), " (no migrations)\n");
    }
}
