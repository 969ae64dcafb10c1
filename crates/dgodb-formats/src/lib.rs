//! Parsers and builders for DGO archive containers
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
//! This crate decodes the archive layer of the decompiler's input: the
//! chunked `oZlB` compression and the header/object layout of DGO and CGO
//! files. Everything it hands out borrows from the caller's buffer.
//!
//! # Modules
//!
//! - [`cursor`]: bounds-checked forward reader used by all parsers
//! - [`dgo`]: compression, headers, container parsing and building
//!
//! # Design Principles
//!
//! - **No panics on input**: malformed data yields a [`FormatError`]
//! - **Symmetric Operations**: archives can be built as well as parsed
//! - **Zero-Copy Parsing**: object data is sliced, not copied

#![warn(missing_docs)]

pub mod cursor;
pub mod dgo;
mod error;

pub use cursor::ByteCursor;
pub use error::{FormatError, FormatResult};
