//! Deduplicating store for object files extracted from DGO archives
//!
//! [`ObjectFileDb`] ingests archives, identifies each object by name and
//! content fingerprint, and keeps one copy of every distinct variant along
//! with per-archive membership and ingestion statistics.
//!
//! # Example
//!
//! ```
//! use dgodb_formats::dgo::DgoBuilder;
//! use dgodb_store::ObjectFileDb;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let game = DgoBuilder::new("GAME.CGO")
//!     .object("gkernel", vec![1, 2, 3, 4])
//!     .build()?;
//! let common = DgoBuilder::new("COMMON.CGO")
//!     .object("gkernel", vec![1, 2, 3, 4])
//!     .build()?;
//!
//! let mut db: ObjectFileDb = ObjectFileDb::new();
//! db.add_archive("GAME.CGO", &game)?;
//! db.add_archive("COMMON.CGO", &common)?;
//!
//! assert_eq!(db.len(), 1);
//! assert_eq!(db.get("gkernel", 0).map(|e| e.reference_count()), Some(2));
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `parallel`: decode archive files concurrently with rayon. Objects are
//!   still inserted one archive at a time, in the order given.

#![warn(missing_docs)]

mod db;
mod error;
mod matcher;
mod record;
mod staged;
mod stats;

pub use db::{ArchiveSummary, LISTING_FILE_NAME, ObjectFileDb};
pub use error::{StoreError, StoreResult};
pub use matcher::{ContentMatcher, ExactMatcher, FingerprintMatcher};
pub use record::{ObjectEntry, ObjectRecord, VERSION_SEPARATOR};
pub use staged::StagedArchive;
pub use stats::IngestStats;
