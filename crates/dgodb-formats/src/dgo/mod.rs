//! DGO archive containers
//!
//! DGO (and CGO) files bundle the compiled object files that make up a game
//! level or subsystem. Later titles wrap the whole container in a chunked
//! LZO stream tagged `oZlB`; [`decompress_if_needed`] removes that layer so
//! [`parse_archive`] always sees the plain container.
//!
//! # Example
//!
//! ```
//! use dgodb_formats::dgo::{DgoBuilder, decompress_if_needed, parse_archive};
//!
//! let file = DgoBuilder::new("GAME.CGO")
//!     .object("game-info", vec![0; 16])
//!     .build()
//!     .expect("valid archive");
//!
//! let data = decompress_if_needed(&file).expect("valid stream");
//! let archive = parse_archive(&data, "GAME.CGO").expect("valid container");
//! assert_eq!(archive.objects[0].name, "game-info");
//! ```

mod builder;
mod compression;
mod container;
mod header;

pub use builder::DgoBuilder;
pub use compression::{
    COMPRESSED_MAGIC, MAX_CHUNK_SIZE, decompress, decompress_if_needed, is_compressed,
};
#[cfg(any(test, feature = "fixtures"))]
pub use compression::{compress, encode_literal_block};
pub use container::{DgoArchive, DgoObject, archive_base_name, parse_archive};
pub use header::{DgoHeader, HEADER_LEN, NAME_FIELD_LEN, RawDgoHeader};
