//! Error types for forecast table loading.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for forecast table operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors that abort a forecast table load. No partial table is ever
/// returned alongside one of these.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open forecast table {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("forecast table is empty: {0}")]
    Empty(String),

    #[error("malformed row in {origin} at line {line}: {reason}")]
    Malformed {
        origin: String,
        line: u64,
        reason: String,
    },

    #[error("failed to read {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: csv::Error,
    },
}
