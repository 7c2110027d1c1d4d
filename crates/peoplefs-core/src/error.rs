//! Error types for peoplefs.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for peoplefs operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Metadata extraction failed
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// The input tree could not be walked
    #[error("cannot walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Metadata extraction errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("extraction failed: {0}")]
    Failed(String),
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for peoplefs operations.
pub type Result<T> = std::result::Result<T, Error>;
