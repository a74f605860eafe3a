use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::params;
use rusqlite::types::Type;

use super::*;

/// Legacy rows may carry SQLite's `datetime('now')` layout.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl WorklogDb {
    // =========================================================================
    // Entries
    // =========================================================================

    /// Helper: map a row selected with [`ENTRY_COLUMNS`] to `Entry`.
    pub(crate) fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
        let date: String = row.get(1)?;
        let created_at: String = row.get(9)?;
        Ok(Entry {
            id: row.get(0)?,
            date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
            customer: row.get(2)?,
            project: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            contact: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            summary: row.get(5)?,
            actions: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            next_steps: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            tags: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(&created_at, LEGACY_TIMESTAMP_FORMAT))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?,
        })
    }

    /// Insert a draft and return the id SQLite assigned to it.
    ///
    /// The draft is stored as given; trimming and required-field checks happen
    /// in [`EntryDraft::normalized`] before this is called.
    pub fn insert_entry(&self, draft: &EntryDraft, created_at: NaiveDateTime) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO entries (
                date, customer, project, contact, summary, actions, next_steps, tags, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                draft.date.format(DATE_FORMAT).to_string(),
                draft.customer,
                draft.project,
                draft.contact,
                draft.summary,
                draft.actions,
                draft.next_steps,
                draft.tags,
                created_at.format(TIMESTAMP_FORMAT).to_string(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::debug!("Inserted entry {} ({} / {})", id, draft.date, draft.customer);
        Ok(id)
    }
}
