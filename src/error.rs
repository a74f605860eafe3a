//! Error types for work log operations
//!
//! Errors are classified by who can resolve them:
//! - RequiresUserAction: a required field was left empty, an unknown field was named
//! - Fatal: the database could not be opened or its schema brought up to date
//! - Operation: a single read or write failed; the caller may retry or abort

use thiserror::Error;

use crate::db::{DbError, EntryField};

/// A draft that must be corrected before it can be stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    EmptyField(EntryField),
}

/// A field name outside the queryable set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown field '{0}' (expected one of: date, customer, project, contact, summary, actions, next_steps, tags)")]
pub struct UnknownField(pub String);

/// Error type for work log operations
#[derive(Debug, Error)]
pub enum WorklogError {
    #[error("Invalid entry: {0}")]
    Validation(#[from] ValidationError),

    #[error("Schema setup failed: {0}")]
    Schema(#[source] DbError),

    #[error("Query failed: {0}")]
    Query(#[source] DbError),

    #[error("Insert failed: {0}")]
    Insert(#[source] DbError),
}

impl WorklogError {
    /// Returns true if the process cannot continue with this database
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorklogError::Schema(_))
    }

    /// Returns true if the user has to change their input to resolve this error
    pub fn requires_user_action(&self) -> bool {
        matches!(self, WorklogError::Validation(_))
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            WorklogError::Validation(ValidationError::EmptyField(EntryField::Customer)) => {
                "Enter the customer name and save again."
            }
            WorklogError::Validation(ValidationError::EmptyField(EntryField::Summary)) => {
                "Describe what was done in the summary and save again."
            }
            WorklogError::Validation(_) => "Fill in the required fields and save again.",
            WorklogError::Schema(_) => {
                "Check that the database path is writable and the file is a worklog database."
            }
            WorklogError::Query(_) => "The database could not be read. Try again.",
            WorklogError::Insert(_) => "The entry was not saved. Try again.",
        }
    }
}
