use chrono::NaiveDate;
use rusqlite::params;

use super::*;

/// Newest first: later dates first, later inserts first within a date.
const NEWEST_FIRST: &str = "ORDER BY date DESC, id DESC";

impl WorklogDb {
    // =========================================================================
    // Retrieval
    // =========================================================================

    fn query_entries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Entry>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::map_entry_row)?;
        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        log::debug!("Query returned {} entries", entries.len());
        Ok(entries)
    }

    /// Every entry, newest first.
    pub fn all_entries(&self) -> Result<Vec<Entry>, DbError> {
        self.query_entries(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries {NEWEST_FIRST}"),
            [],
        )
    }

    /// Entries logged for one calendar date, most recently inserted first.
    pub fn entries_on(&self, date: NaiveDate) -> Result<Vec<Entry>, DbError> {
        self.query_entries(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE date = ?1 ORDER BY id DESC"),
            params![date.format(DATE_FORMAT).to_string()],
        )
    }

    /// Entries for an exact customer name, newest first.
    pub fn entries_for_customer(&self, customer: &str) -> Result<Vec<Entry>, DbError> {
        self.query_entries(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE customer = ?1 {NEWEST_FIRST}"),
            params![customer],
        )
    }

    /// Entries for an exact project name, newest first.
    ///
    /// An empty name selects the unassigned bucket: NULL and empty `project`
    /// are the same thing.
    pub fn entries_for_project(&self, project: &str) -> Result<Vec<Entry>, DbError> {
        let project = project.trim();
        if project.is_empty() {
            return self.query_entries(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries
                     WHERE project IS NULL OR project = '' {NEWEST_FIRST}"
                ),
                [],
            );
        }
        self.query_entries(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE project = ?1 {NEWEST_FIRST}"),
            params![project],
        )
    }

    /// Entries where `term` occurs in any textual field, newest first.
    ///
    /// Matching uses SQLite `LIKE`, so it is case-insensitive for ASCII only.
    /// `%` and `_` in the term match literally. An empty term matches everything.
    pub fn search_entries(&self, term: &str) -> Result<Vec<Entry>, DbError> {
        let predicate = EntryField::ALL
            .iter()
            .map(|f| format!("{} LIKE ?1 ESCAPE '\\'", f.column()))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.query_entries(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE {predicate} {NEWEST_FIRST}"),
            params![format!("%{}%", escape_like(term))],
        )
    }

    /// Sorted distinct values of `field`, leaving out NULL and blank values.
    pub fn distinct_values(&self, field: EntryField) -> Result<Vec<String>, DbError> {
        let column = field.column();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT {column} FROM entries
             WHERE {column} IS NOT NULL AND TRIM({column}) != ''
             ORDER BY {column} ASC"
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Escape LIKE wildcards so the term matches as a plain substring.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
