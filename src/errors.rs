//! Unified error types for the ERP core.
//!
//! Every core operation returns [`Result`]. The request-handler layer in
//! [`crate::api`] converts these errors into structured responses, so nothing
//! here is ever allowed to bring the process down.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All errors produced by the ERP core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input, reported with the offending field.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the input field that failed validation
        field: String,
        /// Human-readable explanation
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Key used for the lookup
        key: String,
    },

    /// The access gate rejected the operation.
    #[error("Permission denied: {action} on {area}")]
    PermissionDenied {
        /// Feature area that was requested
        area: String,
        /// Action that was requested
        action: String,
    },

    /// The requested status change is not allowed from the current status.
    #[error("Cannot apply `{action}` to a document in status {from}")]
    InvalidTransition {
        /// Status the document was in
        from: String,
        /// Action that was requested
        action: String,
    },

    /// The next value of a series would not fit its padded width.
    #[error("Series {series} exhausted at width {width}")]
    SeriesExhausted {
        /// Series prefix
        series: &'static str,
        /// Fixed digit width of the series
        width: usize,
    },

    /// Stored series state could not be parsed.
    #[error("Series {series} state is corrupt: {detail}")]
    CorruptSeriesState {
        /// Series prefix
        series: &'static str,
        /// What could not be parsed
        detail: String,
    },

    /// A unique identifier or email is already taken.
    #[error("Duplicate {field}: {value}")]
    DuplicateKey {
        /// Field carrying the unique constraint
        field: String,
        /// Conflicting value
        value: String,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable explanation
        message: String,
    },

    /// Document rendering failed.
    #[error("Render error: {message}")]
    Render {
        /// Human-readable explanation
        message: String,
    },

    /// Email dispatch failed.
    #[error("Notification error: {message}")]
    Notification {
        /// Human-readable explanation
        message: String,
    },

    /// Persistence layer failure.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Delimited file could not be read.
    #[error("Import error: {0}")]
    Import(#[from] csv::Error),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Maps a unique-constraint violation onto [`Error::DuplicateKey`], leaving
    /// every other database error untouched.
    #[must_use]
    pub fn from_insert(err: DbErr, field: &str, value: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::DuplicateKey {
                field: field.to_string(),
                value: value.to_string(),
            },
            _ => Self::Database(err),
        }
    }

    /// [`Error::from_insert`] for tables with several unique columns.
    ///
    /// `candidates` pairs each unique column with the value being written. The
    /// column named in the violation is reported, falling back to the first.
    #[must_use]
    pub fn from_unique_insert(err: DbErr, candidates: &[(&str, &str)]) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                let (field, value) = candidates
                    .iter()
                    .find(|(column, _)| detail.contains(column))
                    .or_else(|| candidates.first())
                    .copied()
                    .unwrap_or(("key", ""));
                Self::DuplicateKey {
                    field: field.to_string(),
                    value: value.to_string(),
                }
            }
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
