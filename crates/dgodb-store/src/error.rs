//! Error types for the object file store

use std::path::PathBuf;

use dgodb_formats::FormatError;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while building or exporting the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// An archive could not be decoded
    #[error("failed to load archive {}: {source}", path.display())]
    Archive {
        /// Path of the archive
        path: PathBuf,
        /// Underlying format error
        #[source]
        source: FormatError,
    },

    /// Format error without a file path (in-memory archives)
    #[error(transparent)]
    Format(#[from] FormatError),

    /// I/O error while reading an archive or writing a report
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path involved in the failed operation
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Statistics could not be serialized
    #[error("failed to serialize statistics: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// The format error at the root of this failure, if any
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            Self::Archive { source, .. } | Self::Format(source) => Some(source),
            Self::Io { .. } | Self::Json(_) => None,
        }
    }
}
