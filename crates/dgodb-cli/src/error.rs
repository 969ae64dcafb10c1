//! Error types for the command-line tool

use std::path::PathBuf;

use dgodb_store::StoreError;
use thiserror::Error;

/// Invalid command-line configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No archive was given
    #[error("no archives given")]
    NoArchives,

    /// Output was requested without a place to put it
    #[error("--output-dir (or DGODB_OUTPUT_DIR) is required with {0}")]
    MissingOutputDir(String),
}

/// Errors from a run of the tool
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Building the database or writing its listing failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Writing an output file failed
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// File or directory being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Statistics could not be serialized
    #[error("failed to serialize statistics: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for tool operations
pub type CliResult<T> = Result<T, CliError>;
