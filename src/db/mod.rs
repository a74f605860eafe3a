//! SQLite-backed storage for work log entries.
//!
//! One file holds one `entries` table plus the lookup indexes created by
//! [`crate::migrations`]. A `WorklogDb` wraps a single connection; callers open
//! one per unit of work and drop it when done, so no state outlives a call.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

pub mod types;
pub use types::*;

mod entries;
mod queries;

/// How long a connection waits on another process's write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Columns selected for every entry read, in `map_entry_row` order.
pub(crate) const ENTRY_COLUMNS: &str =
    "id, date, customer, project, contact, summary, actions, next_steps, tags, created_at";

pub struct WorklogDb {
    conn: Connection,
}

impl WorklogDb {
    /// Open (or create) a database file. The schema is not touched; call
    /// [`WorklogDb::ensure_schema`] once at startup.
    pub fn open_at(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // WAL lets readers proceed while another process inserts
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Ok(Self { conn })
    }

    /// Create or upgrade the schema. Returns the number of migration steps applied.
    pub fn ensure_schema(&self) -> Result<usize, DbError> {
        crate::migrations::run_migrations(&self.conn)
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================
