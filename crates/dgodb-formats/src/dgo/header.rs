//! DGO header structures
//!
//! The same 64-byte layout is used for the archive header and for the header
//! in front of every embedded object: a little-endian `u32` followed by a
//! 60-byte null-terminated name. For the archive header the `u32` is the
//! object count, for object headers it is the object's byte length.

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

use crate::cursor::ByteCursor;
use crate::error::{FormatError, FormatResult};

/// Size of the name field in bytes, terminator included
pub const NAME_FIELD_LEN: usize = 60;

/// Size of a full header in bytes
pub const HEADER_LEN: usize = 4 + NAME_FIELD_LEN;

/// On-disk header layout
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct RawDgoHeader {
    /// Object count (archive header) or byte length (object header)
    pub size: u32,
    /// Null-terminated name, zero padded
    pub name: [u8; NAME_FIELD_LEN],
}

/// Validated header with a decoded name
///
/// Only built through [`DgoHeader::new`] or [`DgoHeader::read`], so the name
/// always fits the fixed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DgoHeader {
    size: u32,
    name: String,
}

impl DgoHeader {
    /// Create a header, checking the name fits the fixed field
    pub fn new(size: u32, name: impl Into<String>) -> FormatResult<Self> {
        let name = name.into();
        if name.len() >= NAME_FIELD_LEN {
            return Err(FormatError::MalformedHeader(format!(
                "name {name:?} is {} bytes, limit is {}",
                name.len(),
                NAME_FIELD_LEN - 1
            )));
        }
        if name.bytes().any(|b| b == 0) {
            return Err(FormatError::MalformedHeader(format!(
                "name {name:?} contains a null byte"
            )));
        }
        Ok(Self { size, name })
    }

    /// Read and validate a header from the cursor
    pub fn read(cursor: &mut ByteCursor<'_>) -> FormatResult<Self> {
        let raw: RawDgoHeader = cursor.read()?;
        let name = decode_name(&raw.name)?;
        Ok(Self {
            size: raw.size,
            name,
        })
    }

    /// Object count (archive header) or byte length (object header)
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Name up to the null terminator
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the name out of the header
    pub fn into_name(self) -> String {
        self.name
    }

    /// Convert back to the on-disk layout
    pub fn to_raw(&self) -> RawDgoHeader {
        let mut name = [0u8; NAME_FIELD_LEN];
        name[..self.name.len()].copy_from_slice(self.name.as_bytes());
        RawDgoHeader {
            size: self.size,
            name,
        }
    }

    /// Append the on-disk bytes of this header to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) -> FormatResult<()> {
        let mut writer = Cursor::new(Vec::with_capacity(HEADER_LEN));
        self.to_raw()
            .write_options(&mut writer, binrw::Endian::Little, ())?;
        out.extend_from_slice(writer.get_ref());
        Ok(())
    }
}

/// Decode a fixed name field.
///
/// The field must contain a terminator, and every byte after it must be zero.
fn decode_name(field: &[u8; NAME_FIELD_LEN]) -> FormatResult<String> {
    let end = field.iter().position(|&b| b == 0).ok_or_else(|| {
        FormatError::MalformedHeader("name field has no null terminator".to_string())
    })?;

    if let Some(pos) = field[end..].iter().position(|&b| b != 0) {
        return Err(FormatError::MalformedHeader(format!(
            "non-zero byte 0x{:02X} at offset {} after name terminator",
            field[end + pos],
            end + pos
        )));
    }

    String::from_utf8(field[..end].to_vec())
        .map_err(|e| FormatError::MalformedHeader(format!("name is not valid UTF-8: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn raw_header(size: u32, name: &[u8]) -> Vec<u8> {
        let mut data = size.to_le_bytes().to_vec();
        let mut field = [0u8; NAME_FIELD_LEN];
        field[..name.len()].copy_from_slice(name);
        data.extend_from_slice(&field);
        data
    }

    #[test]
    fn test_read_header() {
        let data = raw_header(7, b"GAME.CGO");
        let mut cursor = ByteCursor::new(&data);
        let header = DgoHeader::read(&mut cursor).unwrap();

        assert_eq!(header.size(), 7);
        assert_eq!(header.name(), "GAME.CGO");
        assert_eq!(cursor.position(), HEADER_LEN);
    }

    #[test]
    fn test_garbage_after_terminator_rejected() {
        let mut data = raw_header(1, b"a.o");
        data[4 + 10] = 0x41;
        let mut cursor = ByteCursor::new(&data);

        let err = DgoHeader::read(&mut cursor).expect_err("garbage after terminator");
        assert!(matches!(err, FormatError::MalformedHeader(_)));
        assert!(err.to_string().contains("offset 10"));
    }

    #[test]
    fn test_missing_terminator_rejected() {
        let data = raw_header(1, &[b'x'; NAME_FIELD_LEN]);
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            DgoHeader::read(&mut cursor),
            Err(FormatError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_short_header_out_of_bounds() {
        let data = raw_header(1, b"a.o");
        let mut cursor = ByteCursor::new(&data[..HEADER_LEN - 1]);
        assert!(matches!(
            DgoHeader::read(&mut cursor),
            Err(FormatError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_write_matches_read() {
        let header = DgoHeader::new(0x1234, "level-info").unwrap();
        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();

        assert_eq!(bytes, raw_header(0x1234, b"level-info"));
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(DgoHeader::read(&mut cursor).unwrap(), header);
    }

    #[test]
    fn test_name_too_long() {
        let name = "n".repeat(NAME_FIELD_LEN);
        assert!(DgoHeader::new(0, name).is_err());
        assert!(DgoHeader::new(0, "n".repeat(NAME_FIELD_LEN - 1)).is_ok());
    }

    #[test]
    fn test_longest_name_writes() {
        let name = "n".repeat(NAME_FIELD_LEN - 1);
        let header = DgoHeader::new(3, name.as_str()).unwrap();
        let raw = header.to_raw();

        assert_eq!(&raw.name[..NAME_FIELD_LEN - 1], name.as_bytes());
        assert_eq!(raw.name[NAME_FIELD_LEN - 1], 0);
        assert_eq!(header.into_name(), name);
    }
}
