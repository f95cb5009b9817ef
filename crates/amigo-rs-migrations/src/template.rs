//! Skeleton generation for new migration files.

use std::path::{Path, PathBuf};

use amigo_rs_core::AmigoResult;
use chrono::{DateTime, Utc};

use crate::script::{DOWN_MARKER, UP_MARKER};

/// Timestamp prefix format: second precision, UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// The slug used when none is given.
pub const DEFAULT_SLUG: &str = "some";

/// Which skeleton to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// A placeholder `create table` / `drop table` pair.
    Table,
    /// Two empty sections.
    Other,
}

impl TemplateKind {
    /// Picks [`TemplateKind::Table`] when the dashified slug mentions `table`.
    pub fn infer(slug: &str) -> Self {
        if dashify(slug).contains("table") {
            Self::Table
        } else {
            Self::Other
        }
    }

    fn content(self) -> String {
        match self {
            Self::Table => format!(
                "{UP_MARKER}\n\
                 create table TABLE_NAME(\n\
                 \tid int auto_increment,\n\
                 \tconstraint primary key (id)\n\
                 );\n\
                 {DOWN_MARKER}\n\
                 drop table TABLE_NAME;"
            ),
            Self::Other => format!("{UP_MARKER}\n{DOWN_MARKER}"),
        }
    }
}

/// Lowercases a slug and turns spaces into underscores.
pub fn dashify(slug: &str) -> String {
    slug.to_lowercase().replace(' ', "_")
}

/// A generated migration file, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationTemplate {
    /// `<timestamp>_create_<slug>.sql`
    pub file_name: String,
    /// The skeleton text.
    pub content: String,
}

impl MigrationTemplate {
    /// Builds the file name and skeleton for `slug` at time `now`.
    pub fn generate(kind: TemplateKind, slug: &str, now: DateTime<Utc>) -> Self {
        Self {
            file_name: format!(
                "{}_create_{}.sql",
                now.format(TIMESTAMP_FORMAT),
                dashify(slug)
            ),
            content: kind.content(),
        }
    }

    /// Writes the file into `dir`, creating the directory if needed, and
    /// returns its path. A file of the same name is overwritten.
    pub fn write_to(&self, dir: &Path) -> AmigoResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.content)?;
        tracing::info!("Created migration {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{MarkerParser, ScriptParser};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_dashify() {
        assert_eq!(dashify("Users Table"), "users_table");
        assert_eq!(dashify("add  Index"), "add__index");
        assert_eq!(dashify("already_fine"), "already_fine");
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(TemplateKind::infer("users_table"), TemplateKind::Table);
        assert_eq!(TemplateKind::infer("Users TABLE"), TemplateKind::Table);
        assert_eq!(TemplateKind::infer("timetables"), TemplateKind::Table);
        assert_eq!(TemplateKind::infer("add_index"), TemplateKind::Other);
    }

    #[test]
    fn test_file_name() {
        let t = MigrationTemplate::generate(TemplateKind::Other, "Add Index", at());
        assert_eq!(t.file_name, "2024_01_02_03_04_05_create_add_index.sql");
    }

    #[test]
    fn test_other_content() {
        let t = MigrationTemplate::generate(TemplateKind::Other, DEFAULT_SLUG, at());
        assert_eq!(t.content, "/* -- migrate_up -- */\n/* -- migrate_down -- */");
        assert_eq!(t.file_name, "2024_01_02_03_04_05_create_some.sql");
    }

    #[test]
    fn test_table_content_parses() {
        let t = MigrationTemplate::generate(TemplateKind::Table, "users table", at());
        assert!(t.content.starts_with("/* -- migrate_up -- */\ncreate table TABLE_NAME(\n\tid"));

        let parsed = MarkerParser::new().parse(&t.content);
        assert_eq!(
            parsed.up,
            "create table TABLE_NAME(\nid int auto_increment,\nconstraint primary key (id)\n);"
        );
        assert_eq!(parsed.down, "drop table TABLE_NAME;");
    }

    #[test]
    fn test_write_to_creates_dir_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("db").join("migrations");

        let t = MigrationTemplate::generate(TemplateKind::Other, "a", at());
        let path = t.write_to(&target).unwrap();
        assert_eq!(path, target.join("2024_01_02_03_04_05_create_a.sql"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), t.content);

        let again = MigrationTemplate::generate(TemplateKind::Table, "a", at());
        again.write_to(&target).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), again.content);
    }
}
