//! # Run-Length Encoding Service
//!
//! Minimal byte-oriented RLE: the output is a sequence of `(count, byte)`
//! pairs with `1 <= count <= 255`. Runs longer than 255 split into multiple
//! pairs. The stream is self-delimiting; decode consumes pairs until the
//! input ends.
//!
//! Worst case (no repeats) doubles the input, which is acceptable for a
//! service selected explicitly per field.

use crate::error::{Error, Result};

/// Encodes `src` as `(count, byte)` pairs.
pub fn encode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() / 2 + 8);
    let mut i = 0;
    while i < src.len() {
        let byte = src[i];
        let mut run = 1usize;
        while run < 255 && i + run < src.len() && src[i + run] == byte {
            run += 1;
        }
        out.push(run as u8);
        out.push(byte);
        i += run;
    }
    out
}

/// Expands a `(count, byte)` pair stream. `hint` pre-sizes the output.
pub fn decode(src: &[u8], hint: usize) -> Result<Vec<u8>> {
    if src.len() % 2 != 0 {
        return Err(Error::Compression("rle stream has a dangling byte"));
    }
    let mut out = Vec::with_capacity(hint);
    for pair in src.chunks_exact(2) {
        let count = pair[0] as usize;
        if count == 0 {
            return Err(Error::Compression("rle run of length zero"));
        }
        out.resize(out.len() + count, pair[1]);
    }
    Ok(out)
}
