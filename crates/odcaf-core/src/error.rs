//! Error types for dataset loading and query validation.

use thiserror::Error;

/// Fatal problems with the source file as a whole.
///
/// Individual malformed rows are never reported here; they are skipped
/// and counted in [`DatasetIndex::skipped_rows`](crate::DatasetIndex::skipped_rows).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("dataset has no header line")]
    MissingHeader,

    #[error("dataset header has no `{0}` column")]
    MissingColumn(&'static str),
}

/// Errors surfaced to callers of the query boundary.
///
/// "Zero matches" is never an error: searches and filters that hit nothing
/// return an empty [`QueryResult`](crate::QueryResult).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The caller supplied input the query cannot run with.
    #[error("{0}")]
    InvalidInput(String),

    /// A point lookup named an identifier that is not in the dataset.
    #[error("Facility with ID {0} not found")]
    NotFound(i64),
}

impl QueryError {
    pub fn invalid(message: impl Into<String>) -> Self {
        QueryError::InvalidInput(message.into())
    }
}
