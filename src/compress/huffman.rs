//! # Canonical Huffman Service
//!
//! Byte-oriented canonical Huffman coding. The blob is self-describing:
//!
//! ```text
//! varUint originalLen
//! [u8; 256] code lengths        -- only when originalLen > 0; 0 = absent
//! bitstream                     -- MSB-first, zero-padded to a byte
//! ```
//!
//! Codes are canonical (assigned by ascending `(length, symbol)`), so the
//! length table alone reconstructs the code book and identical input always
//! produces identical output.
//!
//! Code lengths are capped at 56 so a decoder accumulator fits comfortably
//! in a `u64`; exceeding the cap requires a pathologically skewed multi-
//! hundred-megabyte input and is reported as a service error.

use crate::error::{Error, Result};
use crate::encoding::varint::{read_varuint, write_varuint};

const MAX_CODE_LEN: usize = 56;

/// Computes per-symbol code lengths from a frequency table.
///
/// Ties are broken by node creation order with leaves seeded in symbol
/// order, which keeps the tree shape deterministic.
fn code_lengths(freq: &[u64; 256]) -> Result<[u8; 256]> {
    struct Node {
        freq: u64,
        depth_of: Vec<u8>, // symbols under this node
    }

    let mut live: Vec<Node> = Vec::new();
    for sym in 0..256 {
        if freq[sym] > 0 {
            live.push(Node {
                freq: freq[sym],
                depth_of: vec![sym as u8],
            });
        }
    }

    let mut lengths = [0u8; 256];
    match live.len() {
        0 => return Ok(lengths),
        1 => {
            lengths[live[0].depth_of[0] as usize] = 1;
            return Ok(lengths);
        }
        _ => {}
    }

    // Standard two-smallest merge; `live` is small (<=256), so linear scans
    // beat a heap here and keep tie-breaking order explicit: the earliest
    // node wins ties, and merged nodes append at the back.
    while live.len() > 1 {
        let mut lo = 0;
        for i in 1..live.len() {
            if live[i].freq < live[lo].freq {
                lo = i;
            }
        }
        let a = live.swap_remove(lo);
        let mut lo = 0;
        for i in 1..live.len() {
            if live[i].freq < live[lo].freq {
                lo = i;
            }
        }
        let b = live.swap_remove(lo);

        let mut merged = Node {
            freq: a.freq + b.freq,
            depth_of: a.depth_of,
        };
        merged.depth_of.extend_from_slice(&b.depth_of);
        for &sym in &merged.depth_of {
            lengths[sym as usize] += 1;
            if lengths[sym as usize] as usize > MAX_CODE_LEN {
                return Err(Error::Compression("huffman code length cap exceeded"));
            }
        }
        live.push(merged);
    }
    Ok(lengths)
}

/// Assigns canonical codes from a length table. Returns `(code, len)` per
/// symbol, zero for absent symbols.
fn canonical_codes(lengths: &[u8; 256]) -> [(u64, u8); 256] {
    let mut codes = [(0u64, 0u8); 256];
    let mut by_len: Vec<(u8, u8)> = Vec::new(); // (len, symbol)
    for sym in 0..256 {
        if lengths[sym] > 0 {
            by_len.push((lengths[sym], sym as u8));
        }
    }
    by_len.sort_unstable();

    let mut code = 0u64;
    let mut prev_len = 0u8;
    for &(len, sym) in &by_len {
        code <<= len - prev_len;
        codes[sym as usize] = (code, len);
        code += 1;
        prev_len = len;
    }
    codes
}

/// Encodes `src` into a self-describing canonical Huffman blob.
pub fn encode(src: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(src.len() / 2 + 280);
    write_varuint(&mut out, src.len() as u64);
    if src.is_empty() {
        return Ok(out);
    }

    let mut freq = [0u64; 256];
    for &b in src {
        freq[b as usize] += 1;
    }
    let lengths = code_lengths(&freq)?;
    let codes = canonical_codes(&lengths);

    out.extend_from_slice(&lengths);

    let mut acc = 0u64;
    let mut nbits = 0u32;
    for &b in src {
        let (code, len) = codes[b as usize];
        acc = (acc << len) | code;
        nbits += u32::from(len);
        while nbits >= 8 {
            nbits -= 8;
            out.push((acc >> nbits) as u8);
        }
    }
    if nbits > 0 {
        out.push((acc << (8 - nbits)) as u8);
    }
    Ok(out)
}

/// Decodes a blob produced by [`encode`].
pub fn decode(blob: &[u8]) -> Result<Vec<u8>> {
    let (original_len, header) = read_varuint(blob)?;
    let original_len = original_len as usize;
    if original_len == 0 {
        return Ok(Vec::new());
    }
    if blob.len() < header + 256 {
        return Err(Error::Compression("huffman blob missing length table"));
    }
    let mut lengths = [0u8; 256];
    lengths.copy_from_slice(&blob[header..header + 256]);
    let bits = &blob[header + 256..];

    // Canonical decode tables: per length, the first code, the number of
    // codes, and where that length's symbols start in the sorted order.
    let mut sorted: Vec<(u8, u8)> = Vec::new();
    for sym in 0..256 {
        if lengths[sym] > 0 {
            sorted.push((lengths[sym], sym as u8));
        }
    }
    if sorted.is_empty() {
        return Err(Error::Compression("huffman blob has no symbols"));
    }
    sorted.sort_unstable();
    let max_len = sorted.last().map(|&(l, _)| l as usize).unwrap_or(0);
    if max_len > MAX_CODE_LEN {
        return Err(Error::Compression("huffman code length cap exceeded"));
    }

    let mut first_code = [0u64; MAX_CODE_LEN + 1];
    let mut count = [0u64; MAX_CODE_LEN + 1];
    let mut base_index = [0usize; MAX_CODE_LEN + 1];
    for (i, &(len, _)) in sorted.iter().enumerate() {
        if count[len as usize] == 0 {
            base_index[len as usize] = i;
        }
        count[len as usize] += 1;
    }
    let mut code = 0u64;
    for len in 1..=max_len {
        code <<= 1;
        first_code[len] = code;
        code += count[len];
    }

    let mut out = Vec::with_capacity(original_len);
    let mut acc = 0u64;
    let mut acc_len = 0usize;
    let mut pos = 0usize;
    while out.len() < original_len {
        if acc_len > max_len {
            return Err(Error::Compression("huffman bitstream desynchronized"));
        }
        if acc_len >= 1 {
            let len = acc_len;
            let offset = acc.wrapping_sub(first_code[len]);
            if count[len] > 0 && acc >= first_code[len] && offset < count[len] {
                out.push(sorted[base_index[len] + offset as usize].1);
                acc = 0;
                acc_len = 0;
                continue;
            }
        }
        // Pull one more bit.
        if pos / 8 >= bits.len() {
            return Err(Error::Compression("huffman bitstream truncated"));
        }
        let bit = (bits[pos / 8] >> (7 - pos % 8)) & 1;
        acc = (acc << 1) | u64::from(bit);
        acc_len += 1;
        pos += 1;
    }
    Ok(out)
}
