//! DGO archive builder

#[cfg(any(test, feature = "fixtures"))]
use super::compression;
use super::header::{DgoHeader, HEADER_LEN};
use crate::error::{FormatError, FormatResult};

/// Builder for DGO archives
///
/// # Example
///
/// ```
/// use dgodb_formats::dgo::{DgoBuilder, parse_archive};
///
/// let data = DgoBuilder::new("GAME.CGO")
///     .object("a.o", vec![1, 2, 3])
///     .build()
///     .expect("valid archive");
/// let archive = parse_archive(&data, "GAME.CGO").expect("parses");
/// assert_eq!(archive.objects[0].data, &[1, 2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct DgoBuilder {
    name: String,
    objects: Vec<(String, Vec<u8>)>,
}

impl DgoBuilder {
    /// Start an archive with the given header name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    /// Append an object
    pub fn object(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.objects.push((name.into(), data));
        self
    }

    /// Serialize as an uncompressed archive
    pub fn build(&self) -> FormatResult<Vec<u8>> {
        let object_bytes: usize = self.objects.iter().map(|(_, d)| d.len()).sum();
        let mut out = Vec::with_capacity(HEADER_LEN * (self.objects.len() + 1) + object_bytes);

        DgoHeader::new(size_field(self.objects.len())?, self.name.as_str())?.write_to(&mut out)?;
        for (name, data) in &self.objects {
            DgoHeader::new(size_field(data.len())?, name.as_str())?.write_to(&mut out)?;
            out.extend_from_slice(data);
        }

        Ok(out)
    }

    /// Serialize and wrap in the chunked `oZlB` compression
    #[cfg(any(test, feature = "fixtures"))]
    pub fn build_compressed(&self) -> FormatResult<Vec<u8>> {
        compression::compress(&self.build()?)
    }
}

fn size_field(value: usize) -> FormatResult<u32> {
    u32::try_from(value).map_err(|_| {
        FormatError::MalformedHeader(format!("{value} does not fit the 32-bit size field"))
    })
}
