//! # Record Header Codec
//!
//! Every vtable-mode record starts with a fixed header. Two on-wire layouts
//! exist, selected by `FLAG_NO_SCHEMA_ID`:
//!
//! ```text
//! With schema ID (40 bytes)            Without (32 bytes)
//! +--------+----------------------+    +--------+----------------------+
//! |  0..4  | Magic "DBF3"         |    |  0..4  | Magic "DBF3"         |
//! |  4..6  | Version (LE)         |    |  4..6  | Version (LE)         |
//! |  6..8  | Flags                |    |  6..8  | Flags                |
//! |  8..16 | SchemaID             |    |   8    | HotBitmap            |
//! |   16   | HotBitmap            |    |   9    | VTableSlots          |
//! |   17   | VTableSlots          |    | 10..12 | DataOffset           |
//! | 18..20 | DataOffset           |    | 12..16 | VTableOff            |
//! | 20..24 | VTableOff            |    | 16..32 | reserved (zero)      |
//! | 24..40 | reserved (zero)      |    +--------+----------------------+
//! +--------+----------------------+
//! ```
//!
//! All multi-byte fields are little-endian, including Version: both the
//! emit and parse paths use little-endian, and a regression test pins this
//! down because it is easy to get the two directions out of step.
//!
//! Parsing rejects buffers shorter than 20 bytes outright and checks the
//! magic before anything else. The version is retained in the parsed header
//! for upgrade logic; only version 1 is defined.

use crate::encoding::fixed::{read_u16, read_u32, read_u64};
use crate::error::{Error, Result};
use crate::records::types::{flags, HEADER_SIZE, MAGIC, SLOT_SIZE, VERSION};

/// Minimum buffer length [`RecordHeader::parse`] accepts.
pub const MIN_HEADER_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordHeader {
    pub magic: u32,
    pub version: u16,
    pub flags: u16,
    pub schema_id: u64,
    pub hot_bitmap: u8,
    pub vtable_slots: u8,
    pub data_offset: u16,
    pub vtable_off: u32,
}

impl RecordHeader {
    /// Encoded size for the given flag word.
    pub const fn encoded_len(header_flags: u16) -> usize {
        if header_flags & flags::NO_SCHEMA_ID != 0 {
            HEADER_SIZE - 8
        } else {
            HEADER_SIZE
        }
    }

    /// Appends the encoded header to `buf`. Reserved bytes are zero-filled.
    pub fn emit_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.magic.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        if self.flags & flags::NO_SCHEMA_ID == 0 {
            buf.extend_from_slice(&self.schema_id.to_le_bytes());
        }
        buf.push(self.hot_bitmap);
        buf.push(self.vtable_slots);
        buf.extend_from_slice(&self.data_offset.to_le_bytes());
        buf.extend_from_slice(&self.vtable_off.to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);
    }

    /// Parses a header from the front of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < MIN_HEADER_LEN {
            return Err(Error::BadHeader("buffer shorter than minimum header"));
        }
        let magic = read_u32(buf, 0)?;
        if magic != MAGIC {
            return Err(Error::BadMagic(magic));
        }
        let version = read_u16(buf, 4)?;
        let header_flags = read_u16(buf, 6)?;

        let mut h = RecordHeader {
            magic,
            version,
            flags: header_flags,
            ..RecordHeader::default()
        };
        if header_flags & flags::NO_SCHEMA_ID != 0 {
            h.hot_bitmap = buf[8];
            h.vtable_slots = buf[9];
            h.data_offset = read_u16(buf, 10)?;
            h.vtable_off = read_u32(buf, 12)?;
        } else {
            h.schema_id = read_u64(buf, 8)?;
            h.hot_bitmap = buf[16];
            h.vtable_slots = buf[17];
            h.data_offset = read_u16(buf, 18)?;
            h.vtable_off = read_u32(buf, 20)?;
        }
        Ok(h)
    }
}

/// Builds a version-1 header for the given layout parameters.
pub fn make_header(
    header_flags: u16,
    schema_id: u64,
    hot_bitmap: u8,
    vtable_slots: u8,
) -> RecordHeader {
    let hsize = RecordHeader::encoded_len(header_flags);
    RecordHeader {
        magic: MAGIC,
        version: VERSION,
        flags: header_flags,
        schema_id,
        hot_bitmap,
        vtable_slots,
        data_offset: (hsize + vtable_slots as usize * SLOT_SIZE) as u16,
        vtable_off: hsize as u32,
    }
}
