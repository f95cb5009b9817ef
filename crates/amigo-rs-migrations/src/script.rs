//! Splitting a migration file into its up and down halves.
//!
//! A migration file is plain SQL with two marker lines:
//!
//! ```text
//! /* -- migrate_up -- */
//! create table users(id int);
//! /* -- migrate_down -- */
//! drop table users;
//! ```
//!
//! [`MarkerParser`] is a two-state line scanner, not a SQL grammar. Any line
//! whose trimmed text *contains* a marker switches sections, which means a
//! statement that happens to mention `migrate_down` on its own line is
//! misread as a marker. The [`ScriptParser`] trait lets a stricter tokenizer
//! replace it without touching the engine.

/// The line that opens the up section in generated files.
pub const UP_MARKER: &str = "/* -- migrate_up -- */";

/// The line that opens the down section in generated files.
pub const DOWN_MARKER: &str = "/* -- migrate_down -- */";

/// The two halves of a migration file.
///
/// Either half may be empty, meaning there is nothing to run in that
/// direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScript {
    /// SQL run when applying the migration.
    pub up: String,
    /// SQL run when reverting the migration.
    pub down: String,
}

impl ParsedScript {
    /// Returns the body for the given direction.
    pub fn body(&self, backwards: bool) -> &str {
        if backwards {
            &self.down
        } else {
            &self.up
        }
    }
}

/// Splits a migration document into up and down bodies.
pub trait ScriptParser: Send + Sync {
    /// Parses the full text of one migration file.
    fn parse(&self, content: &str) -> ParsedScript;
}

/// The marker-substring parser used by migration files.
#[derive(Debug, Clone)]
pub struct MarkerParser {
    up_marker: String,
    down_marker: String,
}

impl MarkerParser {
    /// Creates a parser recognizing `migrate_up` and `migrate_down`.
    pub fn new() -> Self {
        Self::with_markers("migrate_up", "migrate_down")
    }

    /// Creates a parser with custom marker substrings.
    pub fn with_markers(up_marker: impl Into<String>, down_marker: impl Into<String>) -> Self {
        Self {
            up_marker: up_marker.into(),
            down_marker: down_marker.into(),
        }
    }
}

impl Default for MarkerParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParser for MarkerParser {
    fn parse(&self, content: &str) -> ParsedScript {
        let mut up = String::new();
        let mut down = String::new();
        let mut in_down = false;

        for line in content.lines() {
            let text = line.trim();
            // The up marker wins when a line carries both.
            if text.contains(&self.up_marker) {
                in_down = false;
            } else if text.contains(&self.down_marker) {
                in_down = true;
            } else {
                let section = if in_down { &mut down } else { &mut up };
                section.push_str(text);
                section.push('\n');
            }
        }

        ParsedScript {
            up: up.trim().to_string(),
            down: down.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParsedScript {
        MarkerParser::new().parse(content)
    }

    #[test]
    fn test_parse_users_table() {
        let parsed = parse(
            "/* -- migrate_up -- */\ncreate table users(id int);\n/* -- migrate_down -- */\ndrop table users;",
        );
        assert_eq!(parsed.up, "create table users(id int);");
        assert_eq!(parsed.down, "drop table users;");
    }

    #[test]
    fn test_parse_multiline_sections_trim_each_line() {
        let parsed = parse(
            "/* -- migrate_up -- */\n  create table a(\n\tid int\n  );\n\n/* -- migrate_down -- */\n\n  drop table a;  \n",
        );
        assert_eq!(parsed.up, "create table a(\nid int\n);");
        assert_eq!(parsed.down, "drop table a;");
    }

    #[test]
    fn test_text_before_first_marker_is_up() {
        let parsed = parse("insert into t values (1);\n/* -- migrate_down -- */\ndelete from t;");
        assert_eq!(parsed.up, "insert into t values (1);");
        assert_eq!(parsed.down, "delete from t;");
    }

    #[test]
    fn test_empty_sections() {
        let parsed = parse("/* -- migrate_up -- */\n/* -- migrate_down -- */");
        assert_eq!(parsed, ParsedScript::default());
        assert_eq!(parse(""), ParsedScript::default());
    }

    #[test]
    fn test_sections_can_alternate() {
        let parsed = parse("-- migrate_up\na;\n-- migrate_down\nb;\n-- migrate_up\nc;");
        assert_eq!(parsed.up, "a;\nc;");
        assert_eq!(parsed.down, "b;");
    }

    #[test]
    fn test_marker_substring_in_sql_is_misread() {
        // Known limitation of the substring contract.
        let parsed = parse("/* -- migrate_up -- */\nselect 'migrate_down';\nselect 1;");
        assert_eq!(parsed.up, "");
        assert_eq!(parsed.down, "select 1;");
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        let parsed = parse("MIGRATE_UP\na;\nMIGRATE_DOWN\nb;");
        assert_eq!(parsed.up, "MIGRATE_UP\na;\nMIGRATE_DOWN\nb;");
        assert!(parsed.down.is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let parsed = parse("/* -- migrate_up -- */\r\ncreate table t(id int);\r\n/* -- migrate_down -- */\r\ndrop table t;\r\n");
        assert_eq!(parsed.up, "create table t(id int);");
        assert_eq!(parsed.down, "drop table t;");
    }

    #[test]
    fn test_custom_markers() {
        let parser = MarkerParser::with_markers("+goose Up", "+goose Down");
        let parsed = parser.parse("-- +goose Up\na;\n-- +goose Down\nb;");
        assert_eq!(parsed.up, "a;");
        assert_eq!(parsed.down, "b;");
    }

    #[test]
    fn test_body_by_direction() {
        let parsed = parse("a;\n/* -- migrate_down -- */\nb;");
        assert_eq!(parsed.body(false), "a;");
        assert_eq!(parsed.body(true), "b;");
    }
}
