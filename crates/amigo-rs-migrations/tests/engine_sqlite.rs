//! End-to-end tests for the migration engine on SQLite.
//!
//! Each test writes migration files into a temporary directory and runs the
//! executor against a file database, then inspects both the schema and the
//! `amigo_migrations` ledger through a second connection.

use std::fs;
use std::path::Path;

use amigo_rs_core::AmigoError;
use amigo_rs_db::{DatabaseBackendType, DbExecutor, Value};
use amigo_rs_db_backends::SqliteBackend;
use amigo_rs_migrations::{
    MigrationConfig, MigrationExecutor, MigrationLoader, MigrationState, MigrationTemplate,
    TemplateKind,
};
use tempfile::TempDir;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("migrations")).unwrap();
        Self { dir }
    }

    fn migrations(&self) -> std::path::PathBuf {
        self.dir.path().join("migrations")
    }

    fn db_path(&self) -> std::path::PathBuf {
        self.dir.path().join("app.db")
    }

    fn write(&self, name: &str, up: &str, down: &str) {
        fs::write(
            self.migrations().join(name),
            format!("/* -- migrate_up -- */\n{up}\n/* -- migrate_down -- */\n{down}\n"),
        )
        .unwrap();
    }

    /// Writes `count` migrations creating tables `t0`, `t1`, ...
    fn write_tables(&self, count: usize) {
        for i in 0..count {
            self.write(
                &format!("2024_01_01_00_00_{i:02}_create_t{i}_table.sql"),
                &format!("create table t{i}(id int);"),
                &format!("drop table t{i};"),
            );
        }
    }

    fn loader(&self) -> MigrationLoader {
        MigrationLoader::new(self.migrations())
    }

    fn connect(&self) -> SqliteBackend {
        SqliteBackend::open(self.db_path()).unwrap()
    }
}

fn executor() -> MigrationExecutor {
    MigrationExecutor::new(MigrationConfig::for_backend(DatabaseBackendType::SQLite)).unwrap()
}

async fn ledger(db: &dyn DbExecutor) -> Vec<(String, i64)> {
    db.query(
        "SELECT name, priority FROM amigo_migrations ORDER BY priority",
        &[],
    )
    .await
    .unwrap()
    .iter()
    .map(|row| (row.get("name").unwrap(), row.get("priority").unwrap()))
    .collect()
}

async fn table_exists(db: &dyn DbExecutor, table: &str) -> bool {
    !db.query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        &[Value::from(table)],
    )
    .await
    .unwrap()
    .is_empty()
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── up ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_up_applies_sorted_files_with_positional_priorities() {
    let project = Project::new();
    // Written out of order on purpose.
    project.write("2024_01_03_create_c.sql", "create table c(id int);", "drop table c;");
    project.write("2024_01_01_create_a.sql", "create table a(id int);", "drop table a;");
    project.write("2024_01_02_create_b.sql", "create table b(id int);", "drop table b;");
    fs::write(project.migrations().join(".DS_Store"), "junk").unwrap();

    let db = project.connect();
    let applied = executor().apply_pending(&project.loader(), &db).await.unwrap();
    assert_eq!(
        applied,
        vec![
            "2024_01_01_create_a.sql",
            "2024_01_02_create_b.sql",
            "2024_01_03_create_c.sql",
        ]
    );

    let reader = project.connect();
    assert_eq!(
        ledger(&reader).await,
        vec![
            ("2024_01_01_create_a.sql".to_string(), 0),
            ("2024_01_02_create_b.sql".to_string(), 1),
            ("2024_01_03_create_c.sql".to_string(), 2),
        ]
    );
    for t in ["a", "b", "c"] {
        assert!(table_exists(&reader, t).await);
    }
}

#[tokio::test]
async fn test_up_is_idempotent() {
    let project = Project::new();
    project.write_tables(3);
    let db = project.connect();
    let exec = executor();

    assert_eq!(exec.apply_pending(&project.loader(), &db).await.unwrap().len(), 3);
    // Re-running would fail on "table already exists" if any body ran again.
    assert!(exec.apply_pending(&project.loader(), &db).await.unwrap().is_empty());
    assert_eq!(ledger(&db).await.len(), 3);
}

#[tokio::test]
async fn test_up_applies_only_new_files() {
    let project = Project::new();
    project.write_tables(2);
    let db = project.connect();
    let exec = executor();
    exec.apply_pending(&project.loader(), &db).await.unwrap();

    project.write_tables(4);
    let applied = exec.apply_pending(&project.loader(), &db).await.unwrap();
    assert_eq!(
        applied,
        vec![
            "2024_01_01_00_00_02_create_t2_table.sql",
            "2024_01_01_00_00_03_create_t3_table.sql",
        ]
    );
    let priorities: Vec<i64> = ledger(&db).await.into_iter().map(|(_, p)| p).collect();
    assert_eq!(priorities, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_up_on_empty_directory_is_noop() {
    let project = Project::new();
    let db = project.connect();
    assert!(executor().apply_pending(&project.loader(), &db).await.unwrap().is_empty());
    assert!(table_exists(&db, "amigo_migrations").await);
    assert!(ledger(&db).await.is_empty());
}

#[tokio::test]
async fn test_up_failure_in_third_of_five_records_nothing() {
    let project = Project::new();
    project.write_tables(5);
    project.write(
        "2024_01_01_00_00_02_create_t2_table.sql",
        "create table t2(id int);\nthis is not sql;",
        "drop table t2;",
    );

    let db = project.connect();
    let err = executor().apply_pending(&project.loader(), &db).await.unwrap_err();
    match &err {
        AmigoError::MigrationError { name, .. } => {
            assert_eq!(name, "2024_01_01_00_00_02_create_t2_table.sql");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 1);

    let reader = project.connect();
    assert!(ledger(&reader).await.is_empty());
    // DDL is transactional on SQLite: the first two tables are gone too.
    assert!(!table_exists(&reader, "t0").await);
    assert!(!table_exists(&reader, "t1").await);
}

#[tokio::test]
async fn test_up_with_missing_directory_fails() {
    let project = Project::new();
    let db = project.connect();
    let loader = MigrationLoader::new(project.dir.path().join("nowhere"));
    let err = executor().apply_pending(&loader, &db).await.unwrap_err();
    assert!(matches!(err, AmigoError::IoError(_)));
}

#[tokio::test]
async fn test_up_detects_duplicate_name_as_integrity_error() {
    let project = Project::new();
    project.write("b.sql", "", "");
    let db = project.connect();
    let exec = executor();
    exec.apply_pending(&project.loader(), &db).await.unwrap();

    // "a.sql" sorts first, pushing "b.sql" to index 1 where the ledger has
    // nothing, so "b.sql" is inserted again.
    project.write("a.sql", "", "");
    let err = exec.apply_pending(&project.loader(), &db).await.unwrap_err();
    assert!(err.is_integrity_error(), "got {err:?}");
    assert_eq!(ledger(&db).await, vec![("b.sql".to_string(), 0)]);
}

// ── down / rollback ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_down_reverts_everything_newest_first() {
    let project = Project::new();
    project.write_tables(3);
    let db = project.connect();
    let exec = executor();
    exec.apply_pending(&project.loader(), &db).await.unwrap();

    let reverted = exec.revert_all(&project.loader(), &db).await.unwrap();
    assert_eq!(
        reverted,
        vec![
            "2024_01_01_00_00_02_create_t2_table.sql",
            "2024_01_01_00_00_01_create_t1_table.sql",
            "2024_01_01_00_00_00_create_t0_table.sql",
        ]
    );
    assert!(ledger(&db).await.is_empty());
    assert!(table_exists(&db, "amigo_migrations").await);
    assert!(!table_exists(&db, "t0").await);
}

#[tokio::test]
async fn test_down_on_empty_ledger_is_noop() {
    let project = Project::new();
    project.write_tables(2);
    let db = project.connect();
    assert!(executor().revert_all(&project.loader(), &db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rollback_two_of_five() {
    let project = Project::new();
    project.write_tables(5);
    let db = project.connect();
    let exec = executor();
    exec.apply_pending(&project.loader(), &db).await.unwrap();

    let reverted = exec.revert_steps(&project.loader(), &db, 2).await.unwrap();
    assert_eq!(reverted.len(), 2);

    let remaining: Vec<i64> = ledger(&db).await.into_iter().map(|(_, p)| p).collect();
    assert_eq!(remaining, vec![0, 1, 2]);
    assert!(table_exists(&db, "t2").await);
    assert!(!table_exists(&db, "t3").await);
    assert!(!table_exists(&db, "t4").await);

    // Re-applying restores exactly the reverted tail.
    let reapplied = exec.apply_pending(&project.loader(), &db).await.unwrap();
    assert_eq!(reapplied.len(), 2);
    assert_eq!(ledger(&db).await.len(), 5);
}

#[tokio::test]
async fn test_rollback_more_steps_than_ledger() {
    let project = Project::new();
    project.write_tables(2);
    let db = project.connect();
    let exec = executor();
    exec.apply_pending(&project.loader(), &db).await.unwrap();

    let reverted = exec.revert_steps(&project.loader(), &db, 10).await.unwrap();
    assert_eq!(reverted.len(), 2);
    assert!(ledger(&db).await.is_empty());
}

#[tokio::test]
async fn test_rollback_failure_keeps_ledger() {
    let project = Project::new();
    project.write_tables(3);
    let db = project.connect();
    let exec = executor();
    exec.apply_pending(&project.loader(), &db).await.unwrap();

    project.write(
        "2024_01_01_00_00_01_create_t1_table.sql",
        "create table t1(id int);",
        "drop table no_such_table;",
    );
    let err = exec.revert_steps(&project.loader(), &db, 3).await.unwrap_err();
    assert!(matches!(err, AmigoError::MigrationError { .. }));
    assert_eq!(ledger(&db).await.len(), 3);
    assert!(table_exists(&db, "t2").await);
}

// ── status ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_reports_applied_pending_and_missing() {
    let project = Project::new();
    project.write_tables(3);
    let db = project.connect();
    let exec = executor();
    exec.apply_pending(&project.loader(), &db).await.unwrap();

    fs::remove_file(
        project
            .migrations()
            .join("2024_01_01_00_00_02_create_t2_table.sql"),
    )
    .unwrap();
    project.write("2024_02_01_create_new.sql", "", "");

    let report = exec.status(&project.loader(), &db).await.unwrap();
    let states: Vec<(String, MigrationState)> =
        report.into_iter().map(|s| (s.name, s.state)).collect();
    assert_eq!(
        states,
        vec![
            (
                "2024_01_01_00_00_00_create_t0_table.sql".to_string(),
                MigrationState::Applied
            ),
            (
                "2024_01_01_00_00_01_create_t1_table.sql".to_string(),
                MigrationState::Applied
            ),
            ("2024_02_01_create_new.sql".to_string(), MigrationState::Pending),
            (
                "2024_01_01_00_00_02_create_t2_table.sql".to_string(),
                MigrationState::Missing
            ),
        ]
    );
}

#[tokio::test]
async fn test_status_on_fresh_database_leaves_schema_alone() {
    let project = Project::new();
    project.write_tables(2);
    let db = project.connect();

    let report = executor().status(&project.loader(), &db).await.unwrap();
    assert_eq!(report.len(), 2);
    assert!(report.iter().all(|s| s.state == MigrationState::Pending));
    assert!(!table_exists(&db, "amigo_migrations").await);
}

// ── configuration ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_custom_table_name() {
    let project = Project::new();
    project.write_tables(1);
    let db = project.connect();
    let exec = MigrationExecutor::new(
        MigrationConfig::for_backend(DatabaseBackendType::SQLite).with_table_name("schema_history"),
    )
    .unwrap();
    exec.apply_pending(&project.loader(), &db).await.unwrap();

    assert!(table_exists(&db, "schema_history").await);
    assert!(!table_exists(&db, "amigo_migrations").await);
}

// ── create ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generated_table_template_round_trips_through_engine() {
    let project = Project::new();
    let now = chrono::Utc::now();
    let template = MigrationTemplate::generate(TemplateKind::infer("users table"), "users table", now);
    // The skeleton's placeholder DDL is MySQL flavored; swap in SQLite's.
    let content = template
        .content
        .replace("\tid int auto_increment,\n\tconstraint primary key (id)", "\tid integer primary key")
        .replace("TABLE_NAME", "users");
    fs::write(project.migrations().join(&template.file_name), content).unwrap();
    assert_eq!(file_names(&project.migrations()), vec![template.file_name.clone()]);

    let db = project.connect();
    let exec = executor();
    exec.apply_pending(&project.loader(), &db).await.unwrap();
    assert!(table_exists(&db, "users").await);

    exec.revert_all(&project.loader(), &db).await.unwrap();
    assert!(!table_exists(&db, "users").await);
}

#[tokio::test]
async fn test_empty_template_applies_and_records() {
    let project = Project::new();
    let template =
        MigrationTemplate::generate(TemplateKind::Other, "some", chrono::Utc::now());
    template.write_to(&project.migrations()).unwrap();

    let db = project.connect();
    let applied = executor().apply_pending(&project.loader(), &db).await.unwrap();
    assert_eq!(applied, vec![template.file_name.clone()]);
    assert_eq!(ledger(&db).await, vec![(template.file_name, 0)]);
}
