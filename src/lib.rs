#![doc = include_str!("../README.md")]
// Declare modules
pub mod block;
pub mod chunks;
pub mod encoding;
pub mod error;
pub mod index;
pub mod options;
pub mod postings;
pub mod section;
pub mod series;
pub mod telemetry;
pub mod tuples;
pub mod types;

/// In-memory block loaded from a directory.
pub use crate::block::Block;
/// Chunk access and the codec boundary.
pub use crate::chunks::{BlockSeriesReader, Chunk, ChunkCodec, Encoding, RawChunkCodec, SeriesReader};
/// Error type for block decoding operations.
pub use crate::error::{BlockError, Result};
/// Main entry point for querying an index buffer.
pub use crate::index::IndexReader;
/// Reader configuration.
pub use crate::options::{ReaderFileConfig, ReaderOptions};
/// Cursor over the series references of one label pair.
pub use crate::postings::ListPostings;
/// Decoded series records.
pub use crate::series::{Series, SeriesLookup};
/// Structured event hook for observability.
pub use crate::telemetry::{BlockEvent, BlockEventListener};
/// Label-value tuples.
pub use crate::tuples::StringTuples;
/// Core data types.
pub use crate::types::{BlockStats, ChunkMeta, ChunkRef, Label, Labels, SeriesRef, Timestamp};
