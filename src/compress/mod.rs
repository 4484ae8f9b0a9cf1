//! # Compression Adapter
//!
//! Byte-in/byte-out compression services behind a single dispatch keyed on
//! the low four bits of a field's compFlags word:
//!
//! | ID | Codec   | Implementation                         |
//! |----|---------|----------------------------------------|
//! | 0  | Raw     | pass-through                           |
//! | 1  | RLE     | in-crate run-length codec ([`rle`])    |
//! | 2  | Huffman | in-crate canonical codec ([`huffman`])  |
//! | 3  | LZ4     | `lz4_flex` size-prepended blocks       |
//! | 4  | Zstd    | `zstd` streaming encode/decode         |
//!
//! Every codec output is self-describing, so [`decompress`]'s size argument
//! is only a pre-allocation hint. All codecs are deterministic: identical
//! input always yields identical output bytes.
//!
//! IDs outside the table fail with `Error::UnknownCompression`.

pub mod huffman;
pub mod rle;

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::records::types::COMPRESSION_MASK;

/// Compression codec identifiers carried in compFlags bits 0-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    Raw = 0,
    Rle = 1,
    Huffman = 2,
    Lz4 = 3,
    Zstd = 4,
}

impl Compression {
    /// Extracts the codec ID from a compFlags word.
    pub fn from_comp_flags(comp_flags: u16) -> Result<Self> {
        match comp_flags & COMPRESSION_MASK {
            0 => Ok(Compression::Raw),
            1 => Ok(Compression::Rle),
            2 => Ok(Compression::Huffman),
            3 => Ok(Compression::Lz4),
            4 => Ok(Compression::Zstd),
            other => Err(Error::UnknownCompression(other)),
        }
    }
}

/// Compresses `raw` with the codec named by `comp_flags`. Raw is a borrowed
/// pass-through; every other codec allocates its output.
pub fn compress<'a>(comp_flags: u16, raw: &'a [u8]) -> Result<Cow<'a, [u8]>> {
    match Compression::from_comp_flags(comp_flags)? {
        Compression::Raw => Ok(Cow::Borrowed(raw)),
        Compression::Rle => Ok(Cow::Owned(rle::encode(raw))),
        Compression::Huffman => Ok(Cow::Owned(huffman::encode(raw)?)),
        Compression::Lz4 => Ok(Cow::Owned(lz4_flex::block::compress_prepend_size(raw))),
        Compression::Zstd => {
            let out = zstd::stream::encode_all(raw, zstd::DEFAULT_COMPRESSION_LEVEL)
                .map_err(|_| Error::Compression("zstd encode failed"))?;
            Ok(Cow::Owned(out))
        }
    }
}

/// Decompresses `blob` with the codec named by `comp_flags`.
/// `uncompressed_hint` pre-sizes the output where the codec honors it; the
/// true length always comes from the self-describing blob.
pub fn decompress<'a>(
    comp_flags: u16,
    blob: &'a [u8],
    uncompressed_hint: usize,
) -> Result<Cow<'a, [u8]>> {
    match Compression::from_comp_flags(comp_flags)? {
        Compression::Raw => Ok(Cow::Borrowed(blob)),
        Compression::Rle => Ok(Cow::Owned(rle::decode(blob, uncompressed_hint)?)),
        Compression::Huffman => Ok(Cow::Owned(huffman::decode(blob)?)),
        Compression::Lz4 => {
            let out = lz4_flex::block::decompress_size_prepended(blob)
                .map_err(|_| Error::Compression("lz4 decode failed"))?;
            Ok(Cow::Owned(out))
        }
        Compression::Zstd => {
            let out = zstd::stream::decode_all(blob)
                .map_err(|_| Error::Compression("zstd decode failed"))?;
            Ok(Cow::Owned(out))
        }
    }
}
