//! Error types for DGO parsing and decompression

use thiserror::Error;

/// Result type for format operations
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors raised while decoding DGO containers
#[derive(Debug, Error)]
pub enum FormatError {
    /// A read or seek would go past the end of the buffer
    #[error("out of bounds: need {needed} bytes at offset {offset}, {remaining} remaining")]
    OutOfBounds {
        /// Cursor offset when the access was attempted
        offset: usize,
        /// Number of bytes the access required
        needed: usize,
        /// Number of bytes left in the buffer
        remaining: usize,
    },

    /// A compressed stream could not be expanded
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// A header name field is not a clean null-terminated string
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// The name embedded in the archive header differs from its file name
    #[error("archive name mismatch: file is {expected:?}, header says {found:?}")]
    ArchiveNameMismatch {
        /// Base name of the archive file
        expected: String,
        /// Name stored in the archive header
        found: String,
    },

    /// An object declares more bytes than the archive has left
    #[error("object {name:?} declares {declared} bytes but only {remaining} remain")]
    TruncatedObject {
        /// Object name from its header
        name: String,
        /// Declared byte length
        declared: usize,
        /// Bytes left in the archive
        remaining: usize,
    },

    /// Bytes remain after the last declared object
    #[error("{remaining} bytes of trailing data after the last object")]
    TrailingData {
        /// Number of unconsumed bytes
        remaining: usize,
    },

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}
