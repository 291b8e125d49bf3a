use serde::{Deserialize, Serialize};

/// Timestamp type (milliseconds since epoch, signed as stored in the block).
pub type Timestamp = i64;

/// Reference to a series record inside the index buffer.
pub type SeriesRef = u32;

/// Reference to a chunk inside the series-data buffer.
pub type ChunkRef = u32;

/// Summary statistics stored in the fixed-size stats section of an index block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStats {
    pub min_time: Timestamp,
    pub max_time: Timestamp,
    pub series_count: u32,
    pub chunk_count: u32,
    pub sample_count: u64,
}

/// A single name/value label pair of a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Labels of a series, in the order the series record lists them.
pub type Labels = Vec<Label>;

/// Time range and location of one chunk. The chunk payload itself is not loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub chunk_ref: ChunkRef,
    pub min_time: Timestamp,
    pub max_time: Timestamp,
}

impl ChunkMeta {
    /// Returns true if the chunk overlaps the closed interval `[mint, maxt]`.
    pub fn overlaps(&self, mint: Timestamp, maxt: Timestamp) -> bool {
        self.min_time <= maxt && self.max_time >= mint
    }
}
