use crate::chunks::{Chunk, SeriesReader};
use crate::error::Result;
use crate::types::{ChunkMeta, Labels};

use std::fmt;
use std::sync::Arc;

/// A decoded series record: labels plus the chunk metas that overlap the queried range.
///
/// Chunk payloads are not loaded; [`Series::chunk`] fetches one through the series reader
/// the record was decoded against.
#[derive(Clone)]
pub struct Series {
    labels: Labels,
    chunks: Vec<ChunkMeta>,
    reader: Arc<dyn SeriesReader>,
}

impl Series {
    pub(crate) fn new(labels: Labels, chunks: Vec<ChunkMeta>, reader: Arc<dyn SeriesReader>) -> Self {
        Self {
            labels,
            chunks,
            reader,
        }
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn chunks(&self) -> &[ChunkMeta] {
        &self.chunks
    }

    /// Loads the chunk referenced by `meta`.
    pub fn chunk(&self, meta: &ChunkMeta) -> Result<Box<dyn Chunk>> {
        self.reader.chunk(meta.chunk_ref)
    }
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("labels", &self.labels)
            .field("chunks", &self.chunks)
            .finish_non_exhaustive()
    }
}

/// Outcome of a series lookup that decoded successfully.
#[derive(Debug, Clone)]
pub enum SeriesLookup {
    Found(Series),
    /// The record exists but none of its chunks overlap the queried range.
    NotInRange,
}

impl SeriesLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, SeriesLookup::Found(_))
    }

    pub fn into_option(self) -> Option<Series> {
        match self {
            SeriesLookup::Found(s) => Some(s),
            SeriesLookup::NotInRange => None,
        }
    }
}
