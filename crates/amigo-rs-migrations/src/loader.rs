//! Migration discovery.
//!
//! A [`MigrationSource`] lists migration names in the order they should be
//! applied and hands back each file's text. [`MigrationLoader`] reads a flat
//! directory on disk; [`MemorySource`] holds scripts in memory for tests and
//! for programs that embed their migrations.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use amigo_rs_core::{AmigoError, AmigoResult};

/// Lists migration files and reads their contents.
pub trait MigrationSource: Send + Sync {
    /// Returns every migration name, sorted lexically.
    fn list_names(&self) -> AmigoResult<Vec<String>>;

    /// Returns the full text of the named migration.
    fn read_script(&self, name: &str) -> AmigoResult<String>;
}

/// Discovers migration files in a single directory.
///
/// Every entry that is not a directory and whose name does not start with `.`
/// counts as a migration, whatever its extension. A migration whose name is
/// not valid UTF-8 fails the listing. Names sort byte-wise, so
/// the timestamp prefix written by
/// [`MigrationTemplate`](crate::template::MigrationTemplate) gives creation
/// order.
#[derive(Debug, Clone)]
pub struct MigrationLoader {
    migrations_dir: PathBuf,
}

impl MigrationLoader {
    /// Creates a loader for the given directory.
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    /// Returns the migrations directory.
    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }
}

/// Attaches the offending path to an I/O error.
fn io_error(path: &Path, e: &io::Error) -> AmigoError {
    AmigoError::IoError(io::Error::new(e.kind(), format!("{}: {e}", path.display())))
}

impl MigrationSource for MigrationLoader {
    fn list_names(&self) -> AmigoResult<Vec<String>> {
        let dir = &self.migrations_dir;
        let entries = std::fs::read_dir(dir).map_err(|e| io_error(dir, &e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(dir, &e))?;
            let file_type = entry.file_type().map_err(|e| io_error(&entry.path(), &e))?;
            if file_type.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            if file_name.to_string_lossy().starts_with('.') {
                continue;
            }
            let name = file_name.into_string().map_err(|_| {
                AmigoError::IoError(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{}: file name is not valid UTF-8", entry.path().display()),
                ))
            })?;
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    fn read_script(&self, name: &str) -> AmigoResult<String> {
        let path = self.migrations_dir.join(name);
        std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AmigoError::ScriptNotFound(path.display().to_string())
            } else {
                io_error(&path, &e)
            }
        })
    }
}

/// An in-memory set of migration scripts.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    scripts: BTreeMap<String, String>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a script, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(name, content);
        self
    }

    /// Adds or replaces a script.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.scripts.insert(name.into(), content.into());
    }

    /// Removes a script, returning its content.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.scripts.remove(name)
    }
}

impl MigrationSource for MemorySource {
    fn list_names(&self) -> AmigoResult<Vec<String>> {
        Ok(self.scripts.keys().cloned().collect())
    }

    fn read_script(&self, name: &str) -> AmigoResult<String> {
        self.scripts
            .get(name)
            .cloned()
            .ok_or_else(|| AmigoError::ScriptNotFound(name.to_string()))
    }
}
