//! Shared type definitions for the database layer.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{UnknownField, ValidationError};

/// Storage format of `entries.date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format of `entries.created_at` (local clock, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `entries` table.
///
/// Optional columns that are NULL in storage (rows written before the column
/// existed) surface as empty strings, so every fetched entry has the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: i64,
    pub date: NaiveDate,
    pub customer: String,
    pub project: String,
    pub contact: String,
    pub summary: String,
    pub actions: String,
    pub next_steps: String,
    /// Comma-separated, free-form.
    pub tags: String,
    pub created_at: NaiveDateTime,
}

impl Entry {
    /// Text value of one queryable field, as it is matched by search.
    pub fn field(&self, field: EntryField) -> String {
        match field {
            EntryField::Date => self.date.format(DATE_FORMAT).to_string(),
            EntryField::Customer => self.customer.clone(),
            EntryField::Project => self.project.clone(),
            EntryField::Contact => self.contact.clone(),
            EntryField::Summary => self.summary.clone(),
            EntryField::Actions => self.actions.clone(),
            EntryField::NextSteps => self.next_steps.clone(),
            EntryField::Tags => self.tags.clone(),
        }
    }
}

/// Field values for an entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    pub date: NaiveDate,
    pub customer: String,
    pub summary: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub actions: String,
    #[serde(default)]
    pub next_steps: String,
    #[serde(default)]
    pub tags: String,
}

impl EntryDraft {
    /// A draft with the required fields set and every optional field empty.
    pub fn new(date: NaiveDate, customer: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            date,
            customer: customer.into(),
            summary: summary.into(),
            project: String::new(),
            contact: String::new(),
            actions: String::new(),
            next_steps: String::new(),
            tags: String::new(),
        }
    }

    /// Trim every text field and check that `customer` and `summary` survive.
    pub fn normalized(&self) -> Result<EntryDraft, ValidationError> {
        let draft = EntryDraft {
            date: self.date,
            customer: self.customer.trim().to_string(),
            summary: self.summary.trim().to_string(),
            project: self.project.trim().to_string(),
            contact: self.contact.trim().to_string(),
            actions: self.actions.trim().to_string(),
            next_steps: self.next_steps.trim().to_string(),
            tags: self.tags.trim().to_string(),
        };
        if draft.customer.is_empty() {
            return Err(ValidationError::EmptyField(EntryField::Customer));
        }
        if draft.summary.is_empty() {
            return Err(ValidationError::EmptyField(EntryField::Summary));
        }
        Ok(draft)
    }
}

/// The closed set of textual entry fields that can be searched or enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryField {
    Date,
    Customer,
    Project,
    Contact,
    Summary,
    Actions,
    NextSteps,
    Tags,
}

impl EntryField {
    pub const ALL: [EntryField; 8] = [
        EntryField::Date,
        EntryField::Customer,
        EntryField::Project,
        EntryField::Contact,
        EntryField::Summary,
        EntryField::Actions,
        EntryField::NextSteps,
        EntryField::Tags,
    ];

    /// Column name in the `entries` table.
    pub fn column(self) -> &'static str {
        match self {
            EntryField::Date => "date",
            EntryField::Customer => "customer",
            EntryField::Project => "project",
            EntryField::Contact => "contact",
            EntryField::Summary => "summary",
            EntryField::Actions => "actions",
            EntryField::NextSteps => "next_steps",
            EntryField::Tags => "tags",
        }
    }
}

impl fmt::Display for EntryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for EntryField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        EntryField::ALL
            .into_iter()
            .find(|f| f.column() == wanted)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}
