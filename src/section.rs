//! Section framing, symbol lookup and offset hashmaps of the index buffer.

use crate::encoding::{
    section_checksum, Decbuf, FLAG_STD, SECTION_HEADER_LEN, SECTION_TRAILER_LEN,
};
use crate::error::{BlockError, Result};

use bytes::Bytes;
use std::collections::HashMap;

/// Mapping from a raw key (label names or `name SEP value`) to a section offset.
///
/// Keys are byte strings: the separator byte is not valid UTF-8 on its own.
pub type OffsetMap = HashMap<Vec<u8>, u32>;

/// A framed region of the index buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub offset: u32,
    pub flag: u8,
    pub payload: Bytes,
    /// Trailer as stored; only compared when checksum verification is enabled.
    pub checksum: u32,
}

impl Section {
    /// Reads the section framed at `offset`. The flag is returned unchecked.
    pub fn read(buf: &Bytes, offset: u32) -> Result<Self> {
        let start = offset as usize;
        let mut d = Decbuf::at(buf, start)?;
        if d.len() < SECTION_HEADER_LEN {
            return Err(BlockError::InvalidSize);
        }
        let flag = d.byte()?;
        let l = d.be32()? as usize;
        if d.len() < l.saturating_add(SECTION_TRAILER_LEN) {
            return Err(BlockError::InvalidSize);
        }
        let payload_start = start + SECTION_HEADER_LEN;
        let payload = buf.slice(payload_start..payload_start + l);
        d.bytes(l)?;
        let checksum = d.be32()?;
        Ok(Self {
            offset,
            flag,
            payload,
            checksum,
        })
    }

    /// Compares the stored trailer with the CRC32 of `flag || length || payload`.
    pub fn verify(&self) -> Result<()> {
        let actual = section_checksum(self.flag, &self.payload);
        if actual != self.checksum {
            return Err(BlockError::ChecksumMismatch {
                offset: self.offset,
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }

    /// Returns the payload if the section uses the standard encoding flag.
    pub fn into_std_payload(self) -> Result<Bytes> {
        if self.flag != FLAG_STD {
            return Err(BlockError::InvalidFlag(self.flag));
        }
        Ok(self.payload)
    }
}

/// Parses a hashmap section into a key → offset map.
///
/// Takes the section lookup result as is so a failed section read propagates unchanged.
pub fn read_hashmap(section: Result<Section>) -> Result<OffsetMap> {
    let payload = section?.into_std_payload()?;
    let mut d = Decbuf::new(&payload);
    let mut h = OffsetMap::new();

    while !d.is_empty() {
        let l = usize::try_from(d.uvarint()?).map_err(|_| BlockError::InvalidSize)?;
        let key = d.bytes(l)?.to_vec();
        let o = d.uvarint32()?;
        h.insert(key, o);
    }
    Ok(h)
}

/// Resolves symbol offsets into interned strings stored in the index buffer.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    buf: Bytes,
}

impl SymbolTable {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Returns the raw symbol bytes at `offset` (`length:uvarint` followed by the bytes).
    pub fn lookup(&self, offset: u32) -> Result<Bytes> {
        let start = offset as usize;
        let mut d = Decbuf::at(&self.buf, start).map_err(|_| BlockError::InvalidLength)?;
        let before = d.len();
        let l = d.uvarint().map_err(|_| BlockError::InvalidLength)?;
        let n = before - d.len();
        let l = usize::try_from(l).map_err(|_| BlockError::InvalidLength)?;
        if l > d.len() {
            return Err(BlockError::InvalidLength);
        }
        Ok(self.buf.slice(start + n..start + n + l))
    }

    /// Like [`SymbolTable::lookup`] but decodes the symbol as UTF-8.
    pub fn lookup_str(&self, offset: u32) -> Result<String> {
        let b = self.lookup(offset)?;
        Ok(std::str::from_utf8(&b)?.to_owned())
    }
}
