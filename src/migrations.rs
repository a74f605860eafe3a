//! Schema migration steps for the `entries` table.
//!
//! Steps are numbered and run in order, each at most once per database, tracked
//! by the `schema_version` table. Every step is also safe to re-run on its own:
//! the baseline uses `IF NOT EXISTS` and the column step only adds what
//! `PRAGMA table_info` reports missing. That lets a database written before
//! versioning existed (an `entries` table but no `schema_version`) go through
//! the full list without losing rows.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::db::DbError;

pub(crate) struct Migration {
    version: i32,
    name: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "baseline",
        apply: create_baseline,
    },
    Migration {
        version: 2,
        name: "optional columns",
        apply: add_optional_columns,
    },
];

/// Nullable columns added after the baseline, or absent from hand-built databases.
const OPTIONAL_COLUMNS: &[&str] = &["project", "contact", "actions", "next_steps", "tags"];

fn create_baseline(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            customer TEXT NOT NULL,
            contact TEXT,
            summary TEXT NOT NULL,
            actions TEXT,
            next_steps TEXT,
            tags TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_date ON entries(date);
        CREATE INDEX IF NOT EXISTS idx_customer ON entries(customer);",
    )
}

fn add_optional_columns(conn: &Connection) -> rusqlite::Result<()> {
    let present = table_columns(conn, "entries")?;
    for column in OPTIONAL_COLUMNS {
        if !present.contains(*column) {
            conn.execute_batch(&format!("ALTER TABLE entries ADD COLUMN {column} TEXT"))?;
            log::info!("Added column entries.{}", column);
        }
    }
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_project ON entries(project);
         CREATE INDEX IF NOT EXISTS idx_tags ON entries(tags);",
    )
}

/// Column names currently present on `table`.
fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect()
}

/// Create the `schema_version` table if it doesn't exist.
fn ensure_schema_version_table(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    Ok(())
}

/// Return the highest applied migration version, or 0 if none.
fn current_version(conn: &Connection) -> Result<i32, DbError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Whether the database already holds an `entries` table.
fn has_entries_table(conn: &Connection) -> Result<bool, DbError> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'entries'")?;
    Ok(stmt.exists([])?)
}

/// Back up an existing database before changing its schema.
///
/// Uses SQLite's online backup API to create a hot copy at
/// `<db_path>.pre-migration.bak`. Skipped for in-memory databases and for
/// databases that have no `entries` table yet.
fn backup_before_migration(conn: &Connection) -> Result<(), DbError> {
    let db_path: String = conn.query_row("PRAGMA database_list", [], |row| row.get(2))?;

    if db_path.is_empty() || db_path == ":memory:" || !has_entries_table(conn)? {
        return Ok(());
    }

    let backup_path = format!("{}.pre-migration.bak", db_path);
    let mut backup_conn = Connection::open(&backup_path)?;
    let backup = rusqlite::backup::Backup::new(conn, &mut backup_conn)?;
    backup.step(-1)?;

    log::info!("Pre-migration backup created at {}", backup_path);
    Ok(())
}

/// Bring the schema up to date.
///
/// Returns the number of migrations applied (0 if already up-to-date).
///
/// Pending steps run inside one `BEGIN IMMEDIATE` transaction, and the version
/// is re-read once the write lock is held, so two processes starting at the
/// same time apply each step once between them.
///
/// Forward-compat guard: a database whose version is higher than the highest
/// known migration is rejected rather than written to.
pub fn run_migrations(conn: &Connection) -> Result<usize, DbError> {
    ensure_schema_version_table(conn)?;

    let max_known = MIGRATIONS.last().map(|m| m.version).unwrap_or(0);
    let current = current_version(conn)?;
    check_not_newer(current, max_known)?;
    if current == max_known {
        return Ok(0);
    }

    backup_before_migration(conn)?;

    conn.execute_batch("BEGIN IMMEDIATE")?;
    match apply_pending(conn, max_known) {
        Ok(applied) => {
            conn.execute_batch("COMMIT")?;
            Ok(applied)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

fn apply_pending(conn: &Connection, max_known: i32) -> Result<usize, DbError> {
    let current = current_version(conn)?;
    check_not_newer(current, max_known)?;

    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        (migration.apply)(conn).map_err(|e| {
            DbError::Migration(format!(
                "v{} ({}) failed: {}",
                migration.version, migration.name, e
            ))
        })?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )?;
        log::info!("Applied migration v{} ({})", migration.version, migration.name);
        applied += 1;
    }
    Ok(applied)
}

fn check_not_newer(current: i32, max_known: i32) -> Result<(), DbError> {
    if current > max_known {
        return Err(DbError::Migration(format!(
            "Database schema version ({}) is newer than this version of worklog supports ({}). \
             Please update worklog.",
            current, max_known
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn mem_db() -> Connection {
        Connection::open_in_memory().expect("in-memory db")
    }

    /// Snapshot of `sqlite_master` for comparing schemas.
    fn schema_sql(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT COALESCE(sql, '') FROM sqlite_master ORDER BY type, name")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
        rows.collect::<Result<Vec<_>, _>>().unwrap()
    }

    fn index_names(conn: &Connection) -> HashSet<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'entries'")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
        rows.collect::<Result<HashSet<_>, _>>().unwrap()
    }

    #[test]
    fn test_fresh_db_applies_all_steps() {
        let conn = mem_db();
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, MIGRATIONS.len());
        assert_eq!(current_version(&conn).unwrap(), 2);

        let columns = table_columns(&conn, "entries").unwrap();
        for column in [
            "id", "date", "customer", "project", "contact", "summary", "actions",
            "next_steps", "tags", "created_at",
        ] {
            assert!(columns.contains(column), "missing column {column}");
        }

        let indexes = index_names(&conn);
        for index in ["idx_date", "idx_customer", "idx_project", "idx_tags"] {
            assert!(indexes.contains(index), "missing index {index}");
        }
    }

    #[test]
    fn test_required_columns_reject_null() {
        let conn = mem_db();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO entries (date, customer, summary, created_at)
             VALUES ('2024-01-01', NULL, 'summary', '2024-01-01T09:00:00')",
            [],
        );
        assert!(result.is_err(), "customer is NOT NULL");
    }

    #[test]
    fn test_idempotency() {
        let conn = mem_db();

        let first = run_migrations(&conn).expect("first run");
        assert_eq!(first, 2);
        let schema_once = schema_sql(&conn);

        for _ in 0..3 {
            let again = run_migrations(&conn).expect("repeat run");
            assert_eq!(again, 0, "repeat runs should apply no migrations");
        }
        assert_eq!(schema_sql(&conn), schema_once);
        assert_eq!(current_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_each_step_is_rerunnable() {
        let conn = mem_db();
        for migration in MIGRATIONS {
            (migration.apply)(&conn).expect("first apply");
            (migration.apply)(&conn).expect("second apply");
        }
    }

    #[test]
    fn test_upgrade_adds_project_without_touching_rows() {
        let conn = mem_db();

        // A database written before the project column and version tracking existed
        conn.execute_batch(
            "CREATE TABLE entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                customer TEXT NOT NULL,
                contact TEXT,
                summary TEXT NOT NULL,
                actions TEXT,
                next_steps TEXT,
                tags TEXT,
                created_at TEXT NOT NULL
            );
            INSERT INTO entries (date, customer, contact, summary, actions, next_steps, tags, created_at)
            VALUES ('2024-01-05', 'Acme', 'Kim', 'Sent samples', 'mail', 'follow up', 'ev',
                    '2024-01-05T10:00:00');",
        )
        .expect("seed legacy db");

        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, 2);

        let row: (i64, String, String, String, String, String, String, String, Option<String>) =
            conn.query_row(
                "SELECT id, date, customer, contact, summary, actions, next_steps, tags, project
                 FROM entries",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .expect("existing row should be preserved");

        assert_eq!(row.0, 1);
        assert_eq!(row.1, "2024-01-05");
        assert_eq!(row.2, "Acme");
        assert_eq!(row.3, "Kim");
        assert_eq!(row.4, "Sent samples");
        assert_eq!(row.5, "mail");
        assert_eq!(row.6, "follow up");
        assert_eq!(row.7, "ev");
        assert_eq!(row.8, None, "new column defaults to NULL");
    }

    #[test]
    fn test_upgrade_fills_in_any_missing_optional_column() {
        let conn = mem_db();
        conn.execute_batch(
            "CREATE TABLE entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                customer TEXT NOT NULL,
                summary TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .unwrap();

        run_migrations(&conn).expect("migrations should succeed");
        let columns = table_columns(&conn, "entries").unwrap();
        for column in OPTIONAL_COLUMNS {
            assert!(columns.contains(*column), "missing column {column}");
        }
    }

    #[test]
    fn test_forward_compat_guard() {
        let conn = mem_db();

        ensure_schema_version_table(&conn).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (999)", [])
            .unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert!(
            err.to_string().contains("newer than this version"),
            "error should mention version mismatch: {}",
            err
        );
    }

    #[test]
    fn test_pre_migration_backup_only_for_existing_data() {
        let dir = tempfile::tempdir().expect("tempdir");

        // Fresh file: nothing to protect, no backup
        let fresh_path = dir.path().join("fresh.db");
        let conn = Connection::open(&fresh_path).expect("open db");
        run_migrations(&conn).unwrap();
        assert!(!dir.path().join("fresh.db.pre-migration.bak").exists());

        // Legacy file with rows: backup is written before the upgrade
        let legacy_path = dir.path().join("legacy.db");
        let conn = Connection::open(&legacy_path).expect("open db");
        conn.execute_batch(
            "CREATE TABLE entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                customer TEXT NOT NULL,
                summary TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            INSERT INTO entries (date, customer, summary, created_at)
            VALUES ('2024-01-05', 'Acme', 'Sent samples', '2024-01-05T10:00:00');",
        )
        .unwrap();
        run_migrations(&conn).unwrap();

        let backup_path = dir.path().join("legacy.db.pre-migration.bak");
        assert!(
            backup_path.exists(),
            "pre-migration backup should be created at {}",
            backup_path.display()
        );
        let backup = Connection::open(&backup_path).unwrap();
        let count: i64 = backup
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
