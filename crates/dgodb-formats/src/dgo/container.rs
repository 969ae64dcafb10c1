//! DGO container parsing
//!
//! An uncompressed DGO is an archive header followed by `count` objects,
//! each an object header and exactly `size` bytes of object data. Nothing
//! may follow the last object.

use std::path::Path;

use crate::cursor::ByteCursor;
use crate::error::{FormatError, FormatResult};

use super::header::DgoHeader;

/// One object embedded in an archive, borrowing its bytes from the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DgoObject<'a> {
    /// Object name from its header
    pub name: String,
    /// Offset of the object data inside the archive buffer
    pub offset: usize,
    /// Object bytes
    pub data: &'a [u8],
}

/// A parsed archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DgoArchive<'a> {
    /// Archive name from its header
    pub name: String,
    /// Objects in the order they are stored
    pub objects: Vec<DgoObject<'a>>,
}

impl DgoArchive<'_> {
    /// Number of objects in the archive
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the archive holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Total object bytes in the archive
    pub fn object_bytes(&self) -> usize {
        self.objects.iter().map(|o| o.data.len()).sum()
    }
}

/// File-name component of an archive path, extension included
pub fn archive_base_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Parse an uncompressed archive.
///
/// `expected_name` is the archive's file base name; the header must carry
/// the same name.
pub fn parse_archive<'a>(data: &'a [u8], expected_name: &str) -> FormatResult<DgoArchive<'a>> {
    let mut reader = ByteCursor::new(data);

    let header = DgoHeader::read(&mut reader)?;
    if header.name() != expected_name {
        return Err(FormatError::ArchiveNameMismatch {
            expected: expected_name.to_string(),
            found: header.into_name(),
        });
    }

    // Every object needs at least a header, so a count larger than that is
    // caught by the reads below; cap the reservation to what could fit.
    let max_objects = reader.remaining() / super::header::HEADER_LEN;
    let count = header.size();
    let mut objects = Vec::with_capacity((count as usize).min(max_objects));

    for _ in 0..count {
        let object_header = DgoHeader::read(&mut reader)?;
        let declared = object_header.size() as usize;
        if reader.remaining() < declared {
            return Err(FormatError::TruncatedObject {
                name: object_header.into_name(),
                declared,
                remaining: reader.remaining(),
            });
        }

        let offset = reader.position();
        let data = reader.take(declared)?;
        objects.push(DgoObject {
            name: object_header.into_name(),
            offset,
            data,
        });
    }

    if !reader.is_empty() {
        return Err(FormatError::TrailingData {
            remaining: reader.remaining(),
        });
    }

    Ok(DgoArchive {
        name: header.into_name(),
        objects,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dgo::DgoBuilder;
    use crate::dgo::header::HEADER_LEN;

    fn main_dgo() -> Vec<u8> {
        DgoBuilder::new("main.dgo")
            .object("a.o", vec![0x58; 10])
            .object("b.o", vec![0x59; 5])
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_two_objects() {
        let data = main_dgo();
        let archive = parse_archive(&data, "main.dgo").unwrap();

        assert_eq!(archive.name, "main.dgo");
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.objects[0].name, "a.o");
        assert_eq!(archive.objects[0].data, &[0x58; 10]);
        assert_eq!(archive.objects[0].offset, 2 * HEADER_LEN);
        assert_eq!(archive.objects[1].name, "b.o");
        assert_eq!(archive.objects[1].data, &[0x59; 5]);
        assert_eq!(archive.object_bytes(), 15);
    }

    #[test]
    fn test_name_mismatch() {
        let data = main_dgo();
        let err = parse_archive(&data, "other.dgo").expect_err("wrong name");
        assert!(matches!(err, FormatError::ArchiveNameMismatch { .. }));
    }

    #[test]
    fn test_truncated_object() {
        let mut data = main_dgo();
        data.truncate(data.len() - 1);
        let err = parse_archive(&data, "main.dgo").expect_err("truncated");
        assert!(matches!(
            err,
            FormatError::TruncatedObject {
                declared: 5,
                remaining: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_trailing_data() {
        let mut data = main_dgo();
        data.extend_from_slice(&[0, 0, 0]);
        let err = parse_archive(&data, "main.dgo").expect_err("trailing bytes");
        assert!(matches!(err, FormatError::TrailingData { remaining: 3 }));
    }

    #[test]
    fn test_malformed_object_header() {
        let mut data = main_dgo();
        // Byte 20 of the first object's name field, past "a.o\0"
        data[HEADER_LEN + 4 + 20] = 1;
        let err = parse_archive(&data, "main.dgo").expect_err("garbage in name");
        assert!(matches!(err, FormatError::MalformedHeader(_)));
    }

    #[test]
    fn test_huge_object_count() {
        let mut data = main_dgo();
        data[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            parse_archive(&data, "main.dgo"),
            Err(FormatError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_empty_archive() {
        let data = DgoBuilder::new("EMPTY.DGO").build().unwrap();
        let archive = parse_archive(&data, "EMPTY.DGO").unwrap();
        assert!(archive.is_empty());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(archive_base_name(Path::new("iso/DGO/GAME.CGO")), "GAME.CGO");
        assert_eq!(archive_base_name(Path::new("main.dgo")), "main.dgo");
    }
}
