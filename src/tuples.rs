//! Sorted string tuples returned by label-value lookups.

use crate::encoding::Decbuf;
use crate::error::{BlockError, Result};
use crate::section::SymbolTable;

use bytes::Bytes;
use std::cmp::Ordering;

/// A sorted list of fixed-arity string tuples.
#[derive(Debug, Clone)]
pub enum StringTuples {
    InMemory(MemStringTuples),
    Serialized(SerializedStringTuples),
}

impl StringTuples {
    /// Number of strings per tuple.
    pub fn arity(&self) -> usize {
        match self {
            StringTuples::InMemory(t) => t.arity,
            StringTuples::Serialized(t) => t.arity,
        }
    }

    /// Total number of tuples in the list.
    pub fn len(&self) -> usize {
        match self {
            StringTuples::InMemory(t) => t.len(),
            StringTuples::Serialized(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tuple at position `i`.
    ///
    /// See [`MemStringTuples::get`] and [`SerializedStringTuples::at`] for how `i` is addressed.
    pub fn at(&self, i: usize) -> Result<Vec<String>> {
        match self {
            StringTuples::InMemory(t) => t.get(i).map(<[String]>::to_vec).ok_or(BlockError::InvalidSize),
            StringTuples::Serialized(t) => t.at(i),
        }
    }

    /// Iterates all `len()` tuples in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Vec<String>>> + '_ {
        (0..self.len()).map(move |i| match self {
            StringTuples::InMemory(t) => Ok(t.tuple(i).to_vec()),
            StringTuples::Serialized(t) => t.at(i),
        })
    }
}

/// Tuples held as a flattened vector of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemStringTuples {
    arity: usize,
    entries: Vec<String>,
}

impl MemStringTuples {
    pub fn new(entries: Vec<String>, arity: usize) -> Result<Self> {
        if arity == 0 || entries.len() % arity != 0 {
            return Err(BlockError::InvalidSize);
        }
        Ok(Self { arity, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len() / self.arity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `arity` entries starting at *flattened* position `i`, i.e. `entries[i..i+arity]`.
    ///
    /// Positions are not tuple-aligned: with arity 2, `get(1)` spans the second entry of the
    /// first tuple and the first entry of the second. Use [`MemStringTuples::tuple`] for
    /// tuple-aligned access.
    pub fn get(&self, i: usize) -> Option<&[String]> {
        self.entries.get(i..i.checked_add(self.arity)?)
    }

    /// Tuple-aligned access; panics if `i >= len()`.
    pub fn tuple(&self, i: usize) -> &[String] {
        &self.entries[i * self.arity..(i + 1) * self.arity]
    }

    /// Lexicographic comparison of the `arity` entries at flattened positions `i` and `j`.
    ///
    /// Panics if `i + arity` or `j + arity` exceeds the number of entries.
    pub fn less(&self, i: usize, j: usize) -> bool {
        for k in 0..self.arity {
            match self.entries[i + k].cmp(&self.entries[j + k]) {
                Ordering::Less => return true,
                Ordering::Greater => return false,
                Ordering::Equal => {}
            }
        }
        false
    }

    /// Swaps the `arity` entries at flattened positions `i` and `j`.
    ///
    /// Panics if `i + arity` or `j + arity` exceeds the number of entries.
    pub fn swap(&mut self, i: usize, j: usize) {
        for k in 0..self.arity {
            self.entries.swap(i + k, j + k);
        }
    }

    /// Sorts the tuples lexicographically across all fields in order.
    pub fn sort(&mut self) {
        let arity = self.arity;
        let mut tuples: Vec<Vec<String>> = Vec::with_capacity(self.len());
        let mut it = std::mem::take(&mut self.entries).into_iter();
        loop {
            let t: Vec<String> = it.by_ref().take(arity).collect();
            if t.is_empty() {
                break;
            }
            tuples.push(t);
        }
        tuples.sort();
        self.entries = tuples.into_iter().flatten().collect();
    }

    pub fn into_inner(self) -> Vec<String> {
        self.entries
    }
}

impl From<MemStringTuples> for StringTuples {
    fn from(t: MemStringTuples) -> Self {
        StringTuples::InMemory(t)
    }
}

/// Tuples stored as big-endian `u32` symbol offsets, resolved on access.
#[derive(Debug, Clone)]
pub struct SerializedStringTuples {
    arity: usize,
    payload: Bytes,
    symbols: SymbolTable,
}

impl SerializedStringTuples {
    pub fn new(arity: usize, payload: Bytes, symbols: SymbolTable) -> Result<Self> {
        if arity == 0 || arity > usize::MAX / 4 {
            return Err(BlockError::InvalidSize);
        }
        Ok(Self {
            arity,
            payload,
            symbols,
        })
    }

    pub fn len(&self) -> usize {
        self.payload.len() / (4 * self.arity)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves tuple `i`: the `arity` offsets at `(i * arity + k) * 4` for `k in 0..arity`.
    pub fn at(&self, i: usize) -> Result<Vec<String>> {
        let width = 4 * self.arity;
        let start = i.checked_mul(width).ok_or(BlockError::InvalidSize)?;
        let end = start.checked_add(width).ok_or(BlockError::InvalidSize)?;
        let raw = self.payload.get(start..end).ok_or(BlockError::InvalidSize)?;

        let mut d = Decbuf::new(raw);
        let mut res = Vec::with_capacity(self.arity);
        for _ in 0..self.arity {
            res.push(self.symbols.lookup_str(d.be32()?)?);
        }
        Ok(res)
    }
}

impl From<SerializedStringTuples> for StringTuples {
    fn from(t: SerializedStringTuples) -> Self {
        StringTuples::Serialized(t)
    }
}
