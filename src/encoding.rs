//! Format constants and bounds-checked decoding primitives: unsigned/zig-zag varints,
//! big-endian fixed-width integers, CRC32.

use crate::error::{BlockError, Result};

use crc32fast::Hasher as Crc32;

/// Magic number at the head of an index buffer.
pub const MAGIC_INDEX: u32 = 0xBAAA_D700;

/// Magic number at the head of a series-data buffer.
pub const MAGIC_SERIES: u32 = 0x85BD_40DD;

/// The only supported section encoding flag.
pub const FLAG_STD: u8 = 1;

/// Separator used when joining label names (and name/value pairs) into hashmap keys.
pub const SEP: u8 = 0xff;

/// Offset of the block stats section (directly after the magic and its padding).
pub const STATS_OFFSET: u32 = 8;

/// Payload length of the block stats section.
pub const STATS_LEN: usize = 64;

/// flag(1) + length(4)
pub const SECTION_HEADER_LEN: usize = 5;

/// Reserved CRC32 trailer after every section payload.
pub const SECTION_TRAILER_LEN: usize = 4;

/// magic(4) + trailing hashmap offsets(8) + slack.
pub const MIN_INDEX_LEN: usize = 16;

const MAX_VARINT_LEN64: usize = 10;

/// Decodes an unsigned LEB128 varint from the start of `b`.
///
/// Returns the value and the number of bytes consumed, or `None` if the input ends before
/// the varint terminates or the value overflows 64 bits.
pub fn uvarint(b: &[u8]) -> Option<(u64, usize)> {
    let mut out: u64 = 0;
    let mut shift: u32 = 0;
    for (i, &byte) in b.iter().enumerate().take(MAX_VARINT_LEN64) {
        if byte < 0x80 {
            if i == MAX_VARINT_LEN64 - 1 && byte > 1 {
                return None;
            }
            return Some((out | (u64::from(byte) << shift), i + 1));
        }
        out |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    None
}

/// Decodes a zig-zag encoded signed varint from the start of `b`.
pub fn varint(b: &[u8]) -> Option<(i64, usize)> {
    let (ux, n) = uvarint(b)?;
    let mut x = (ux >> 1) as i64;
    if ux & 1 != 0 {
        x = !x;
    }
    Some((x, n))
}

/// Read cursor over a borrowed byte slice.
///
/// Every read checks the remaining length first and fails with
/// [`BlockError::InvalidSize`] instead of reading past the end.
#[derive(Debug, Clone, Copy)]
pub struct Decbuf<'a> {
    buf: &'a [u8],
}

impl<'a> Decbuf<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Cursor positioned at `offset` within `buf`.
    pub fn at(buf: &'a [u8], offset: usize) -> Result<Self> {
        buf.get(offset..)
            .map(Self::new)
            .ok_or(BlockError::InvalidSize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn uvarint(&mut self) -> Result<u64> {
        let (v, n) = uvarint(self.buf).ok_or(BlockError::InvalidSize)?;
        self.buf = &self.buf[n..];
        Ok(v)
    }

    /// Unsigned varint that must fit in a `u32`.
    pub fn uvarint32(&mut self) -> Result<u32> {
        let v = self.uvarint()?;
        u32::try_from(v).map_err(|_| BlockError::InvalidSize)
    }

    /// Unsigned varint used as an element count: it must fit in `usize` and cannot exceed
    /// the remaining bytes divided by `min_elem_len` (each element needs at least that many).
    pub fn count(&mut self, min_elem_len: usize) -> Result<usize> {
        let v = self.uvarint()?;
        let n = usize::try_from(v).map_err(|_| BlockError::InvalidSize)?;
        if n > self.buf.len() / min_elem_len.max(1) {
            return Err(BlockError::InvalidSize);
        }
        Ok(n)
    }

    pub fn varint(&mut self) -> Result<i64> {
        let (v, n) = varint(self.buf).ok_or(BlockError::InvalidSize)?;
        self.buf = &self.buf[n..];
        Ok(v)
    }

    pub fn byte(&mut self) -> Result<u8> {
        let (&b, rest) = self.buf.split_first().ok_or(BlockError::InvalidSize)?;
        self.buf = rest;
        Ok(b)
    }

    pub fn be32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn be64(&mut self) -> Result<u64> {
        let b = self.bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    /// Takes the next `n` bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(BlockError::InvalidSize);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }
}

/// Reads a big-endian `u32` at an absolute position.
pub fn be32_at(buf: &[u8], pos: usize) -> Result<u32> {
    Decbuf::at(buf, pos)?.be32()
}

/// CRC32 (IEEE) over a section's `flag || length || payload`, as stored in its trailer.
pub fn section_checksum(flag: u8, payload: &[u8]) -> u32 {
    let mut h = Crc32::new();
    h.update(&[flag]);
    h.update(&(payload.len() as u32).to_be_bytes());
    h.update(payload);
    h.finalize()
}

// --- append helpers (fixtures, benches, tooling) ---

pub fn write_var_u64(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

pub fn write_var_i64(buf: &mut Vec<u8>, v: i64) {
    write_var_u64(buf, ((v << 1) ^ (v >> 63)) as u64);
}

pub fn write_u32_be(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn write_u64_be(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Appends a complete section frame: flag, length, payload and CRC32 trailer.
pub fn write_section(buf: &mut Vec<u8>, flag: u8, payload: &[u8]) {
    buf.push(flag);
    write_u32_be(buf, payload.len() as u32);
    buf.extend_from_slice(payload);
    write_u32_be(buf, section_checksum(flag, payload));
}
