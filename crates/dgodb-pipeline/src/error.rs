//! Error types for the analysis pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::enrichment::Phase;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised while analysing stored objects
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An object broke a structural expectation of the analysis
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A phase ran before the phase it depends on
    #[error("{object}: requires phase {required}, object is at {actual}")]
    PhaseOrder {
        /// Unique name of the object
        object: String,
        /// Phase the object must be at
        required: Phase,
        /// Phase the object is at
        actual: Phase,
    },

    /// The linker rejected an object
    #[error("failed to link {object}: {reason}")]
    Link {
        /// Name of the object
        object: String,
        /// Linker message
        reason: String,
    },

    /// Writing an artifact failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Prefix an invariant violation with where it was found
    #[must_use]
    pub fn with_context(self, context: &str) -> Self {
        match self {
            Self::InvariantViolation(message) => {
                Self::InvariantViolation(format!("{context}: {message}"))
            }
            other => other,
        }
    }
}
