//! Fully decoded archives awaiting insertion
//!
//! An archive is decompressed and validated in full before anything from it
//! reaches the store, so a malformed archive never leaves a partial set of
//! objects behind. Decoding touches no shared state and can run on any
//! thread; committing is done by the store owner.

use std::ops::Range;
use std::path::Path;

use dgodb_formats::FormatResult;
use dgodb_formats::dgo::{archive_base_name, decompress, is_compressed, parse_archive};

use crate::error::{StoreError, StoreResult};

/// A decoded, validated archive
#[derive(Debug, Clone)]
pub struct StagedArchive {
    name: String,
    file_size: u64,
    data: Vec<u8>,
    objects: Vec<(String, Range<usize>)>,
}

impl StagedArchive {
    /// Decode archive file contents. `name` is the archive's file base name.
    ///
    /// An uncompressed archive keeps `file_data` as its buffer.
    pub fn decode(name: impl Into<String>, file_data: Vec<u8>) -> FormatResult<Self> {
        let name = name.into();
        let file_size = file_data.len() as u64;
        let data = if is_compressed(&file_data) {
            decompress(&file_data)?
        } else {
            file_data
        };

        let objects = parse_archive(&data, &name)?
            .objects
            .into_iter()
            .map(|object| (object.name, object.offset..object.offset + object.data.len()))
            .collect();

        Ok(Self {
            name,
            file_size,
            data,
            objects,
        })
    }

    /// Read and decode an archive file
    pub fn read(path: &Path) -> StoreResult<Self> {
        let file_data = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::decode(archive_base_name(path), file_data).map_err(|source| StoreError::Archive {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Archive base name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the archive as read, before decompression
    pub const fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of objects in the archive
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the archive holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in archive order
    pub fn objects(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.objects
            .iter()
            .map(|(name, range)| (name.as_str(), &self.data[range.clone()]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use dgodb_formats::FormatError;
    use dgodb_formats::dgo::DgoBuilder;

    #[test]
    fn test_decode_compressed() {
        let file = DgoBuilder::new("ENGINE.CGO")
            .object("gcommon", vec![1; 100])
            .object("gkernel", vec![2; 50])
            .build_compressed()
            .unwrap();

        let file_size = file.len() as u64;
        let staged = StagedArchive::decode("ENGINE.CGO", file).unwrap();
        assert_eq!(staged.name(), "ENGINE.CGO");
        assert_eq!(staged.file_size(), file_size);
        assert_eq!(staged.len(), 2);

        let objects: Vec<(&str, &[u8])> = staged.objects().collect();
        assert_eq!(objects[0], ("gcommon", [1u8; 100].as_slice()));
        assert_eq!(objects[1], ("gkernel", [2u8; 50].as_slice()));
    }

    #[test]
    fn test_decode_plain_reuses_buffer() {
        let file = DgoBuilder::new("KERNEL.CGO")
            .object("gkernel", vec![3; 64])
            .build()
            .unwrap();
        let buffer = file.as_ptr();

        let staged = StagedArchive::decode("KERNEL.CGO", file).unwrap();
        assert_eq!(staged.data.as_ptr(), buffer);
        let objects: Vec<(&str, &[u8])> = staged.objects().collect();
        assert_eq!(objects, vec![("gkernel", [3u8; 64].as_slice())]);
    }

    #[test]
    fn test_read_missing_file() {
        let err = StagedArchive::read(Path::new("/nonexistent/GAME.CGO")).expect_err("missing");
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_read_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("KERNEL.CGO");
        let file = DgoBuilder::new("OTHER.CGO").build().unwrap();
        std::fs::write(&path, file).unwrap();

        let err = StagedArchive::read(&path).expect_err("name mismatch");
        assert!(matches!(
            err.format_error(),
            Some(FormatError::ArchiveNameMismatch { .. })
        ));
    }
}
