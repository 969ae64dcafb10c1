//! Chunked LZO compression used by later DGO archives
//!
//! A compressed archive starts with the `oZlB` magic and the little-endian
//! size of the expanded data. The body is a sequence of 4-byte aligned
//! chunks, each preceded by a `u32` chunk size (zero words before a size are
//! alignment padding):
//!
//! - size below [`MAX_CHUNK_SIZE`]: an LZO1X block of that many bytes
//! - size at or above [`MAX_CHUNK_SIZE`]: [`MAX_CHUNK_SIZE`] bytes stored
//!   verbatim. Some archives carry sizes above the cap here, the value is
//!   only used to select the literal path.
//!
//! The `fixtures` feature adds `compress` and `encode_literal_block` for
//! writing test archives.

use std::borrow::Cow;

use crate::cursor::ByteCursor;
use crate::error::{FormatError, FormatResult};

/// Magic tag at the start of a compressed archive
pub const COMPRESSED_MAGIC: [u8; 4] = *b"oZlB";

/// Largest chunk the compressor emits; also the literal block length
pub const MAX_CHUNK_SIZE: usize = 0x8000;

/// Chunk alignment inside the compressed stream
const CHUNK_ALIGNMENT: usize = 4;

/// Output reserved up front, whatever size the stream declares
const MAX_INITIAL_RESERVE: usize = 0x10_0000;

/// LZO1X end-of-stream instruction
#[cfg(any(test, feature = "fixtures"))]
const LZO_END_MARKER: [u8; 3] = [0x11, 0x00, 0x00];

/// Longest literal run encoded with the single-byte LZO1X form
#[cfg(any(test, feature = "fixtures"))]
const LZO_SHORT_RUN_MAX: usize = 238;

/// Check whether `data` starts with the compressed-archive magic
pub fn is_compressed(data: &[u8]) -> bool {
    data.starts_with(&COMPRESSED_MAGIC)
}

/// Expand `data` if it is compressed, borrowing it unchanged otherwise
pub fn decompress_if_needed(data: &[u8]) -> FormatResult<Cow<'_, [u8]>> {
    if is_compressed(data) {
        decompress(data).map(Cow::Owned)
    } else {
        Ok(Cow::Borrowed(data))
    }
}

/// Expand a compressed archive into its original bytes
///
/// The declared size is not trusted for allocation: the output grows as
/// blocks are decoded, and a stream that runs out before reaching the
/// declared size fails.
pub fn decompress(data: &[u8]) -> FormatResult<Vec<u8>> {
    let mut reader = ByteCursor::new(data);

    let magic: [u8; 4] = reader.read().map_err(stream_ended)?;
    if magic != COMPRESSED_MAGIC {
        return Err(FormatError::Decompression(format!(
            "invalid magic: expected {COMPRESSED_MAGIC:02X?}, got {magic:02X?}"
        )));
    }

    let total_size = reader.read_u32().map_err(stream_ended)? as usize;
    let mut output = Vec::with_capacity(total_size.min(MAX_INITIAL_RESERVE));

    while output.len() < total_size {
        let output_offset = output.len();
        let chunk_size = next_chunk_size(&mut reader)?;

        if chunk_size < MAX_CHUNK_SIZE {
            let block = reader.take(chunk_size).map_err(stream_ended)?;
            let expanded = lzokay_native::decompress_all(block, None).map_err(|e| {
                FormatError::Decompression(format!(
                    "LZO block of {chunk_size} bytes at output offset {output_offset}: {e:?}"
                ))
            })?;

            if expanded.len() > total_size - output_offset {
                return Err(FormatError::Decompression(format!(
                    "block expands to {} bytes at offset {output_offset}, past declared size {total_size}",
                    expanded.len()
                )));
            }
            output.extend_from_slice(&expanded);
        } else {
            let len = MAX_CHUNK_SIZE.min(total_size - output_offset);
            output.extend_from_slice(reader.take(len).map_err(stream_ended)?);
        }

        if output.len() < total_size {
            reader.align(CHUNK_ALIGNMENT).map_err(stream_ended)?;
        }
    }

    Ok(output)
}

/// Skip zero padding words and return the next chunk size
fn next_chunk_size(reader: &mut ByteCursor<'_>) -> FormatResult<usize> {
    loop {
        let word = reader.read_u32().map_err(stream_ended)?;
        if word != 0 {
            return Ok(word as usize);
        }
    }
}

fn stream_ended(err: FormatError) -> FormatError {
    FormatError::Decompression(format!("compressed stream ended early: {err}"))
}

/// Build a compressed archive from `data`.
///
/// Full [`MAX_CHUNK_SIZE`] blocks are stored as literal chunks. The tail is
/// written as LZO1X blocks made of literal runs, which any LZO1X decoder
/// accepts.
#[cfg(any(test, feature = "fixtures"))]
pub fn compress(data: &[u8]) -> FormatResult<Vec<u8>> {
    let total_size = u32::try_from(data.len()).map_err(|_| {
        FormatError::Decompression(format!(
            "{} bytes exceeds the 32-bit size field",
            data.len()
        ))
    })?;

    let mut out = Vec::with_capacity(data.len() + 16);
    out.extend_from_slice(&COMPRESSED_MAGIC);
    out.extend_from_slice(&total_size.to_le_bytes());

    // Leave room for the run header and end marker below the chunk cap
    let lzo_block_max = MAX_CHUNK_SIZE - 512;
    let mut offset = 0;
    while offset < data.len() {
        let remaining = data.len() - offset;
        if remaining >= MAX_CHUNK_SIZE {
            // Safe cast: MAX_CHUNK_SIZE fits in u32
            out.extend_from_slice(&(MAX_CHUNK_SIZE as u32).to_le_bytes());
            out.extend_from_slice(&data[offset..offset + MAX_CHUNK_SIZE]);
            offset += MAX_CHUNK_SIZE;
        } else {
            let len = remaining.min(lzo_block_max);
            let block = encode_literal_block(&data[offset..offset + len]);
            // Safe cast: block is below MAX_CHUNK_SIZE
            out.extend_from_slice(&(block.len() as u32).to_le_bytes());
            out.extend_from_slice(&block);
            offset += len;
        }

        while out.len() % CHUNK_ALIGNMENT != 0 {
            out.push(0);
        }
    }

    Ok(out)
}

/// Encode `literals` as a single LZO1X stream of one literal run
#[cfg(any(test, feature = "fixtures"))]
pub fn encode_literal_block(literals: &[u8]) -> Vec<u8> {
    let mut block = Vec::with_capacity(literals.len() + 8);
    let len = literals.len();

    if len == 0 {
        // nothing to emit but the end marker
    } else if len <= LZO_SHORT_RUN_MAX {
        // Safe cast: len + 17 <= 255
        block.push((len + 17) as u8);
    } else {
        // Long run: 0x00, then 255 per zero byte, then the remainder, plus 18
        block.push(0);
        let mut rest = len - 18;
        while rest > 255 {
            block.push(0);
            rest -= 255;
        }
        // Safe cast: rest is in 1..=255 here
        block.push(rest as u8);
    }

    block.extend_from_slice(literals);
    block.extend_from_slice(&LZO_END_MARKER);
    block
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Assemble a compressed stream from explicit chunk records
    fn stream(total: u32, chunks: &[(u32, &[u8])]) -> Vec<u8> {
        let mut out = COMPRESSED_MAGIC.to_vec();
        out.extend_from_slice(&total.to_le_bytes());
        for (size, body) in chunks {
            while out.len() % 4 != 0 {
                out.push(0);
            }
            out.extend_from_slice(&size.to_le_bytes());
            out.extend_from_slice(body);
        }
        out
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31) ^ seed).collect()
    }

    #[test]
    fn test_literal_block_decodes() {
        let literals = pattern(100, 7);
        let block = encode_literal_block(&literals);
        assert_eq!(block[0], 117);
        assert_eq!(
            lzokay_native::decompress_all(&block, None).unwrap(),
            literals
        );
    }

    #[test]
    fn test_long_literal_block_decodes() {
        for len in [239, 273, 274, 529, 4096, MAX_CHUNK_SIZE - 512] {
            let literals = pattern(len, 3);
            let block = encode_literal_block(&literals);
            assert!(block.len() < MAX_CHUNK_SIZE);
            assert_eq!(
                lzokay_native::decompress_all(&block, None).unwrap(),
                literals,
                "run of {len} bytes"
            );
        }
    }

    #[test]
    fn test_single_lzo_chunk() {
        let original = pattern(40, 1);
        let block = encode_literal_block(&original);
        let data = stream(40, &[(block.len() as u32, block.as_slice())]);

        assert_eq!(decompress(&data).unwrap(), original);
    }

    #[test]
    fn test_oversized_chunk_size_takes_literal_path() {
        // A chunk size above the cap still means exactly one literal block
        let first = pattern(MAX_CHUNK_SIZE, 9);
        let second = pattern(40, 4);
        let block = encode_literal_block(&second);
        let total = (MAX_CHUNK_SIZE + 40) as u32;
        let data = stream(total, &[(0x8123, first.as_slice()), (block.len() as u32, block.as_slice())]);

        let out = decompress(&data).unwrap();
        assert_eq!(out.len(), MAX_CHUNK_SIZE + 40);
        assert_eq!(&out[..MAX_CHUNK_SIZE], &first[..]);
        assert_eq!(&out[MAX_CHUNK_SIZE..], &second[..]);
    }

    #[test]
    fn test_chunk_size_boundary() {
        // 129 run header bytes + 32_635 literals + end marker = 0x7FFF
        let literals = pattern(32_635, 6);
        let block = encode_literal_block(&literals);
        assert_eq!(block.len(), MAX_CHUNK_SIZE - 1);

        let total = literals.len() as u32;
        let data = stream(total, &[(block.len() as u32, block.as_slice())]);
        assert_eq!(decompress(&data).unwrap(), literals);

        // One byte more is a literal chunk, copied verbatim
        let raw = pattern(MAX_CHUNK_SIZE, 8);
        let data = stream(MAX_CHUNK_SIZE as u32, &[(MAX_CHUNK_SIZE as u32, raw.as_slice())]);
        assert_eq!(decompress(&data).unwrap(), raw);
    }

    #[test]
    fn test_huge_declared_size_fails() {
        let mut data = COMPRESSED_MAGIC.to_vec();
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(decompress(&data), Err(FormatError::Decompression(_))));

        // A literal chunk follows, but nothing after it
        let raw = pattern(MAX_CHUNK_SIZE, 1);
        let data = stream(u32::MAX, &[(MAX_CHUNK_SIZE as u32, raw.as_slice())]);
        assert!(matches!(decompress(&data), Err(FormatError::Decompression(_))));
    }

    #[test]
    fn test_literal_chunk_clamped_to_remaining_output() {
        let original = pattern(40, 2);
        let data = stream(40, &[(MAX_CHUNK_SIZE as u32, original.as_slice())]);

        let out = decompress(&data).unwrap();
        assert_eq!(out.len(), 40);
        assert_eq!(out, original);
    }

    #[test]
    fn test_padding_words_skipped() {
        let original = pattern(24, 5);
        let block = encode_literal_block(&original);
        let mut data = COMPRESSED_MAGIC.to_vec();
        data.extend_from_slice(&24u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&(block.len() as u32).to_le_bytes());
        data.extend_from_slice(&block);

        assert_eq!(decompress(&data).unwrap(), original);
    }

    #[test]
    fn test_unaligned_chunks_realigned() {
        // First block is 3 + 17 bytes long, so padding follows it
        let a = pattern(17, 1);
        let b = pattern(10, 2);
        let block_a = encode_literal_block(&a);
        let block_b = encode_literal_block(&b);
        assert_ne!(block_a.len() % 4, 0);
        let data = stream(
            27,
            &[
                (block_a.len() as u32, block_a.as_slice()),
                (block_b.len() as u32, block_b.as_slice()),
            ],
        );

        let mut expected = a;
        expected.extend_from_slice(&b);
        assert_eq!(decompress(&data).unwrap(), expected);
    }

    #[test]
    fn test_truncated_stream_fails() {
        let original = pattern(64, 1);
        let block = encode_literal_block(&original);
        let data = stream(64, &[(block.len() as u32, block.as_slice())]);

        for cut in [3, 6, 10, data.len() - 1] {
            let err = decompress(&data[..cut]).expect_err("truncated stream");
            assert!(matches!(err, FormatError::Decompression(_)), "cut at {cut}");
        }
    }

    #[test]
    fn test_missing_chunks_fails() {
        let original = pattern(16, 1);
        let block = encode_literal_block(&original);
        // Declares more output than the chunks provide
        let data = stream(32, &[(block.len() as u32, block.as_slice())]);
        assert!(matches!(decompress(&data), Err(FormatError::Decompression(_))));
    }

    #[test]
    fn test_corrupt_block_fails() {
        let data = stream(16, &[(4, [0xFFu8; 4].as_slice())]);
        assert!(matches!(decompress(&data), Err(FormatError::Decompression(_))));
    }

    #[test]
    fn test_block_overrunning_output_fails() {
        let original = pattern(32, 1);
        let block = encode_literal_block(&original);
        let data = stream(16, &[(block.len() as u32, block.as_slice())]);
        assert!(matches!(decompress(&data), Err(FormatError::Decompression(_))));
    }

    #[test]
    fn test_uncompressed_data_borrowed() {
        let data = b"GAME.CGO not compressed";
        assert!(!is_compressed(data));
        assert!(matches!(decompress_if_needed(data).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_empty_output() {
        let data = stream(0, &[]);
        assert!(decompress(&data).unwrap().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn compress_round_trip(
            data in prop::collection::vec(any::<u8>(), 0..(2 * MAX_CHUNK_SIZE + 600))
        ) {
            let packed = compress(&data).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(is_compressed(&packed));
            let unpacked = decompress(&packed).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(unpacked, data);
        }

        #[test]
        fn chunk_sizes_around_cap(extra in 0usize..600, pad in 0usize..3) {
            // One literal chunk, `pad` zero words, then an LZO chunk
            let first = pattern(MAX_CHUNK_SIZE, 11);
            let second = pattern(extra + 1, 12);
            let block = encode_literal_block(&second);

            let mut data = COMPRESSED_MAGIC.to_vec();
            data.extend_from_slice(&((MAX_CHUNK_SIZE + second.len()) as u32).to_le_bytes());
            data.extend_from_slice(&((MAX_CHUNK_SIZE + extra) as u32).to_le_bytes());
            data.extend_from_slice(&first);
            data.extend(std::iter::repeat_n(0u8, 4 * pad));
            data.extend_from_slice(&(block.len() as u32).to_le_bytes());
            data.extend_from_slice(&block);

            let out = decompress(&data).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(&out[..MAX_CHUNK_SIZE], &first[..]);
            prop_assert_eq!(&out[MAX_CHUNK_SIZE..], &second[..]);
        }
    }
}
