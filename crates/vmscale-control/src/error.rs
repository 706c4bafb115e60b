//! Control loop error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running the control loop.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("failed to create decision log {path}: {source}")]
    CreateLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decision log write failed: {0}")]
    Write(#[from] csv::Error),

    #[error("decision log flush failed: {0}")]
    Flush(#[from] std::io::Error),

    #[error("control loop is stopped")]
    Stopped,
}

pub type ControlResult<T> = Result<T, ControlError>;
