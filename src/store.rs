//! The work log's public operations.
//!
//! `Worklog` holds only the database path. Every method opens its own
//! connection, does one unit of work and closes it again, so short-lived
//! processes can share a file without coordinating. Storage failures are
//! classified into [`WorklogError`] variants by the kind of operation.

use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

use crate::db::{DbError, Entry, EntryDraft, EntryField, WorklogDb};
use crate::error::WorklogError;

#[derive(Debug, Clone)]
pub struct Worklog {
    path: PathBuf,
}

impl Worklog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<WorklogDb, DbError> {
        WorklogDb::open_at(&self.path)
    }

    fn read<T>(&self, f: impl FnOnce(&WorklogDb) -> Result<T, DbError>) -> Result<T, WorklogError> {
        self.open()
            .and_then(|db| f(&db))
            .map_err(WorklogError::Query)
    }

    /// Create or upgrade the schema. Safe to call on every start.
    pub fn ensure_schema(&self) -> Result<usize, WorklogError> {
        let applied = self
            .open()
            .and_then(|db| db.ensure_schema())
            .map_err(WorklogError::Schema)?;
        if applied > 0 {
            log::info!("Schema of {} upgraded ({} steps)", self.path.display(), applied);
        }
        Ok(applied)
    }

    /// Validate and store a draft, stamped with the current local time.
    pub fn insert(&self, draft: &EntryDraft) -> Result<i64, WorklogError> {
        let draft = draft.normalized()?;
        let db = self.open().map_err(WorklogError::Insert)?;
        db.insert_entry(&draft, local_now())
            .map_err(WorklogError::Insert)
    }

    pub fn all(&self) -> Result<Vec<Entry>, WorklogError> {
        self.read(|db| db.all_entries())
    }

    pub fn by_date(&self, date: NaiveDate) -> Result<Vec<Entry>, WorklogError> {
        self.read(|db| db.entries_on(date))
    }

    pub fn by_customer(&self, customer: &str) -> Result<Vec<Entry>, WorklogError> {
        self.read(|db| db.entries_for_customer(customer))
    }

    /// An empty name returns the entries that have no project.
    pub fn by_project(&self, project: &str) -> Result<Vec<Entry>, WorklogError> {
        self.read(|db| db.entries_for_project(project))
    }

    /// Substring search across every textual field. An empty term returns everything.
    pub fn search(&self, term: &str) -> Result<Vec<Entry>, WorklogError> {
        self.read(|db| db.search_entries(term))
    }

    /// Values for a pick-list: distinct, non-empty, ascending.
    pub fn distinct_values(&self, field: EntryField) -> Result<Vec<String>, WorklogError> {
        self.read(|db| db.distinct_values(field))
    }
}

/// Local wall-clock time truncated to whole seconds.
fn local_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{day, draft};
    use crate::error::ValidationError;

    fn worklog() -> (tempfile::TempDir, Worklog) {
        let dir = tempfile::tempdir().expect("temp dir");
        let worklog = Worklog::new(dir.path().join("worklog.db"));
        worklog.ensure_schema().expect("schema");
        (dir, worklog)
    }

    #[test]
    fn test_ensure_schema_repeated() {
        let (_dir, worklog) = worklog();
        for _ in 0..3 {
            assert_eq!(worklog.ensure_schema().unwrap(), 0);
        }
    }

    #[test]
    fn test_insert_trims_and_stamps() {
        let (_dir, worklog) = worklog();
        let before = local_now();

        let mut d = draft("2024-01-05", "  Acme  ", " Sent samples \n");
        d.project = " Pilot ".to_string();
        let id = worklog.insert(&d).expect("insert");

        let found = worklog.by_date(day("2024-01-05")).unwrap();
        assert_eq!(found.len(), 1);
        let e = &found[0];
        assert_eq!(e.id, id);
        assert_eq!(e.customer, "Acme");
        assert_eq!(e.summary, "Sent samples");
        assert_eq!(e.project, "Pilot");
        assert_eq!(e.created_at.nanosecond(), 0);
        assert!(e.created_at >= before, "created_at is the insert time, not the entry date");
    }

    #[test]
    fn test_insert_rejects_blank_customer_without_writing() {
        let (_dir, worklog) = worklog();

        for customer in ["", "   ", "\t\n"] {
            let err = worklog
                .insert(&draft("2024-01-05", customer, "summary"))
                .unwrap_err();
            assert!(matches!(
                err,
                WorklogError::Validation(ValidationError::EmptyField(EntryField::Customer))
            ));
        }
        let err = worklog.insert(&draft("2024-01-05", "Acme", " ")).unwrap_err();
        assert!(err.requires_user_action());

        assert!(worklog.all().unwrap().is_empty(), "no row is created");
    }

    #[test]
    fn test_search_exactly_one_none_and_all() {
        let (_dir, worklog) = worklog();
        let mut d = draft("2024-01-05", "Acme", "Sent samples");
        d.actions = "called procurement".to_string();
        let target = worklog.insert(&d).unwrap();
        worklog.insert(&draft("2024-01-20", "Globex", "Price check")).unwrap();
        worklog.insert(&draft("2024-02-01", "Initech", "Line audit")).unwrap();

        let hits = worklog.search("procurement").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, target);

        assert!(worklog.search("warranty").unwrap().is_empty());
        assert_eq!(worklog.search("").unwrap().len(), 3);
    }

    #[test]
    fn test_concurrent_ensure_schema_applies_each_step_once() {
        for _ in 0..5 {
            let dir = tempfile::tempdir().expect("temp dir");
            let path = dir.path().join("shared.db");

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let worklog = Worklog::new(&path);
                    std::thread::spawn(move || worklog.ensure_schema())
                })
                .collect();
            let applied: usize = handles
                .into_iter()
                .map(|h| h.join().expect("thread").expect("ensure_schema"))
                .sum();

            assert_eq!(applied, crate::migrations::MIGRATIONS.len());
            assert_eq!(Worklog::new(&path).ensure_schema().unwrap(), 0);
        }
    }

    #[test]
    fn test_unreadable_store_is_a_query_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("notes.db");
        std::fs::write(&path, b"plain text, not a database at all, nothing to see").unwrap();
        let worklog = Worklog::new(&path);

        assert!(matches!(worklog.ensure_schema(), Err(WorklogError::Schema(_))));
        assert!(matches!(worklog.all(), Err(WorklogError::Query(_))));
    }
}
