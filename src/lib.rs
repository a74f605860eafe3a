//! Personal work log: dated records of customer and project interactions,
//! stored in SQLite and queried by date, customer, project or free text.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
mod migrations;
pub mod store;
pub mod summary;

pub use db::{Entry, EntryDraft, EntryField};
pub use error::{UnknownField, ValidationError, WorklogError};
pub use store::Worklog;
