//! Series-data buffer reader and the chunk codec boundary.
//!
//! A chunk at reference `r` is stored as `length:uvarint, encoding:u8, payload:length bytes`.
//! The reader only frames the payload; interpreting it is up to a [`ChunkCodec`].

use crate::encoding::{be32_at, Decbuf, MAGIC_SERIES};
use crate::error::{BlockError, CodecError, Result};
use crate::telemetry::block_metrics;
use crate::types::ChunkRef;

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Read access to serialized series chunks.
pub trait SeriesReader: fmt::Debug + Send + Sync {
    /// Returns the chunk stored at the given reference.
    fn chunk(&self, chunk_ref: ChunkRef) -> Result<Box<dyn Chunk>>;
}

/// A decoded chunk as produced by a codec.
pub trait Chunk: fmt::Debug + Send + Sync {
    /// Encoding tag the chunk was stored with.
    fn encoding(&self) -> u8;
    /// Encoded sample payload.
    fn bytes(&self) -> &[u8];
}

/// Turns an encoding tag plus payload into a chunk.
pub trait ChunkCodec: fmt::Debug + Send + Sync {
    fn decode(&self, encoding: u8, data: Bytes) -> std::result::Result<Box<dyn Chunk>, CodecError>;
}

/// Chunk encodings known to the block format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Encoding {
    None = 0,
    Xor = 1,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown chunk encoding {0}")]
pub struct UnknownEncoding(pub u8);

impl TryFrom<u8> for Encoding {
    type Error = UnknownEncoding;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            0 => Ok(Encoding::None),
            1 => Ok(Encoding::Xor),
            other => Err(UnknownEncoding(other)),
        }
    }
}

/// Chunk that keeps its payload undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    encoding: Encoding,
    data: Bytes,
}

impl RawChunk {
    pub fn new(encoding: Encoding, data: Bytes) -> Self {
        Self { encoding, data }
    }
}

impl Chunk for RawChunk {
    fn encoding(&self) -> u8 {
        self.encoding as u8
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Default codec: accepts the known encodings and hands the payload through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawChunkCodec;

impl ChunkCodec for RawChunkCodec {
    fn decode(&self, encoding: u8, data: Bytes) -> std::result::Result<Box<dyn Chunk>, CodecError> {
        let encoding = Encoding::try_from(encoding)?;
        Ok(Box::new(RawChunk::new(encoding, data)))
    }
}

/// [`SeriesReader`] over an in-memory series-data buffer.
#[derive(Debug, Clone)]
pub struct BlockSeriesReader {
    buf: Bytes,
    codec: Arc<dyn ChunkCodec>,
}

impl BlockSeriesReader {
    /// Validates the series magic and builds a reader using [`RawChunkCodec`].
    pub fn new(buf: Bytes) -> Result<Self> {
        Self::with_codec(buf, Arc::new(RawChunkCodec))
    }

    pub fn with_codec(buf: Bytes, codec: Arc<dyn ChunkCodec>) -> Result<Self> {
        let m = be32_at(&buf, 0)?;
        if m != MAGIC_SERIES {
            return Err(BlockError::InvalidMagic {
                expected: MAGIC_SERIES,
                found: m,
            });
        }
        Ok(Self { buf, codec })
    }

    /// Size of the underlying buffer in bytes.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    fn chunk_payload(&self, chunk_ref: ChunkRef) -> Result<(u8, Bytes)> {
        let mut d = Decbuf::at(&self.buf, chunk_ref as usize)?;
        let l = usize::try_from(d.uvarint()?).map_err(|_| BlockError::InvalidSize)?;
        let enc = d.byte()?;
        let start = self.buf.len() - d.len();
        d.bytes(l)?;
        Ok((enc, self.buf.slice(start..start + l)))
    }
}

impl SeriesReader for BlockSeriesReader {
    fn chunk(&self, chunk_ref: ChunkRef) -> Result<Box<dyn Chunk>> {
        let (enc, data) = self.chunk_payload(chunk_ref).map_err(|e| {
            block_metrics::record_decode_error();
            e
        })?;
        block_metrics::record_chunk_read();
        self.codec.decode(enc, data).map_err(BlockError::Codec)
    }
}
