//! Bounds-checked forward reader over a byte slice
//!
//! Every access is checked against the end of the buffer and fails with
//! [`FormatError::OutOfBounds`] instead of reading past it. Typed reads go
//! through `binrw`, so any `BinRead` type without arguments can be pulled
//! straight off the cursor.

use binrw::BinRead;
use binrw::io::Cursor;

use crate::error::{FormatError, FormatResult};

/// Forward-only reader over an immutable byte buffer
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `data`
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Read a little-endian value and advance past it
    pub fn read<T>(&mut self) -> FormatResult<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let mut reader = Cursor::new(self.here());
        match T::read_options(&mut reader, binrw::Endian::Little, ()) {
            Ok(value) => {
                // Safe cast: position is bounded by the slice length
                self.offset += reader.position() as usize;
                Ok(value)
            }
            Err(e) if e.is_eof() => Err(self.out_of_bounds(std::mem::size_of::<T>())),
            Err(e) => Err(FormatError::BinRw(e)),
        }
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&mut self) -> FormatResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn take(&mut self, len: usize) -> FormatResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.out_of_bounds(len));
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Skip forward `len` bytes
    pub fn skip(&mut self, len: usize) -> FormatResult<()> {
        self.take(len).map(|_| ())
    }

    /// Skip forward to the next multiple of `alignment`
    ///
    /// An alignment of 0 or 1 never moves the cursor.
    pub fn align(&mut self, alignment: usize) -> FormatResult<()> {
        match self.offset.checked_rem(alignment) {
            None | Some(0) => Ok(()),
            Some(misalignment) => self.skip(alignment - misalignment),
        }
    }

    /// Current offset from the start of the buffer
    pub const fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left between the cursor and the end of the buffer
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// True when every byte has been consumed
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// View of the unread part of the buffer
    pub fn here(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    fn out_of_bounds(&self, needed: usize) -> FormatError {
        FormatError::OutOfBounds {
            offset: self.offset,
            needed,
            remaining: self.remaining(),
        }
    }
}
