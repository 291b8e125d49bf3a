//! Index reader: block stats, label-value tuples, postings and series records.
//!
//! The index buffer is laid out as
//!
//! ```text
//! [magic u32][stats section @8][symbols | series | label index | postings sections ...]
//! [label hashmap section][postings hashmap section][label hashmap offset u32][postings hashmap offset u32]
//! ```
//!
//! Both hashmaps are parsed once when the reader is built; everything else is decoded on
//! demand from the shared buffer.

use crate::chunks::SeriesReader;
use crate::encoding::{be32_at, Decbuf, MAGIC_INDEX, MIN_INDEX_LEN, SEP, STATS_LEN, STATS_OFFSET};
use crate::error::{BlockError, Result};
use crate::options::ReaderOptions;
use crate::postings::ListPostings;
use crate::section::{read_hashmap, OffsetMap, Section, SymbolTable};
use crate::series::{Series, SeriesLookup};
use crate::telemetry::{block_metrics, BlockEvent};
use crate::tuples::{SerializedStringTuples, StringTuples};
use crate::types::{BlockStats, ChunkMeta, Label, SeriesRef, Timestamp};

use bytes::Bytes;
use rayon::prelude::*;
use std::sync::Arc;

/// Read access to one index buffer.
///
/// Immutable after construction and safe to share across threads.
#[derive(Debug, Clone)]
pub struct IndexReader {
    series: Arc<dyn SeriesReader>,
    buf: Bytes,
    symbols: SymbolTable,
    labels: OffsetMap,
    postings: OffsetMap,
    opts: ReaderOptions,
}

impl IndexReader {
    /// Builds a reader with default options.
    pub fn new(series: Arc<dyn SeriesReader>, buf: Bytes) -> Result<Self> {
        Self::with_options(series, buf, &ReaderOptions::default())
    }

    /// Validates the magic number and loads the label and postings hashmaps.
    pub fn with_options(series: Arc<dyn SeriesReader>, buf: Bytes, opts: &ReaderOptions) -> Result<Self> {
        match Self::open(series, buf, opts) {
            Ok(r) => {
                opts.event_listener.on_event(BlockEvent::IndexOpened {
                    label_indices: r.labels.len(),
                    postings_entries: r.postings.len(),
                });
                Ok(r)
            }
            Err(e) => {
                block_metrics::record_decode_error();
                opts.event_listener.on_event(BlockEvent::IndexOpenFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn open(series: Arc<dyn SeriesReader>, buf: Bytes, opts: &ReaderOptions) -> Result<Self> {
        if buf.len() < MIN_INDEX_LEN {
            return Err(BlockError::InvalidSize);
        }
        let m = be32_at(&buf, 0)?;
        if m != MAGIC_INDEX {
            return Err(BlockError::InvalidMagic {
                expected: MAGIC_INDEX,
                found: m,
            });
        }

        let mut tail = Decbuf::at(&buf, buf.len() - 8)?;
        let loff = tail.be32()?;
        let poff = tail.be32()?;

        let labels = read_hashmap(read_section(&buf, loff, opts))?;
        let postings = read_hashmap(read_section(&buf, poff, opts))?;

        Ok(Self {
            series,
            symbols: SymbolTable::new(buf.clone()),
            buf,
            labels,
            postings,
            opts: opts.clone(),
        })
    }

    /// Size of the index buffer in bytes.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn section(&self, offset: u32) -> Result<Section> {
        read_section(&self.buf, offset, &self.opts)
    }

    /// Reads the fixed-size block stats record.
    pub fn stats(&self) -> Result<BlockStats> {
        self.decode_stats().map_err(count_corruption)
    }

    fn decode_stats(&self) -> Result<BlockStats> {
        let payload = self.section(STATS_OFFSET)?.into_std_payload()?;
        if payload.len() != STATS_LEN {
            return Err(BlockError::InvalidSize);
        }
        let mut d = Decbuf::new(&payload);
        Ok(BlockStats {
            min_time: d.be64()? as i64,
            max_time: d.be64()? as i64,
            series_count: d.be32()?,
            chunk_count: d.be32()?,
            sample_count: d.be64()?,
        })
    }

    /// Returns the sorted value tuples of the label index over `names`.
    pub fn label_values(&self, names: &[&str]) -> Result<StringTuples> {
        self.decode_label_values(names).map_err(count_corruption)
    }

    fn decode_label_values(&self, names: &[&str]) -> Result<StringTuples> {
        let key = join_key(names.iter().map(|n| n.as_bytes()));
        let off = *self
            .labels
            .get(&key)
            .ok_or_else(|| BlockError::NotFound("label index doesn't exist".to_string()))?;

        let payload = self
            .section(off)
            .map_err(|e| e.in_section(off))?
            .into_std_payload()?;

        let mut d = Decbuf::new(&payload);
        let arity = usize::try_from(d.uvarint()?).map_err(|_| BlockError::InvalidSize)?;
        let consumed = payload.len() - d.len();

        let tuples = SerializedStringTuples::new(arity, payload.slice(consumed..), self.symbols.clone())?;
        Ok(tuples.into())
    }

    /// Lists the label name combinations that have a label index, sorted.
    pub fn label_indices(&self) -> Result<Vec<Vec<String>>> {
        let mut res = self
            .labels
            .keys()
            .map(|k| {
                k.split(|&b| b == SEP)
                    .map(|part| {
                        std::str::from_utf8(part)
                            .map(str::to_owned)
                            .map_err(BlockError::from)
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        res.sort();
        Ok(res)
    }

    /// Returns the series references for `name=value` in stored order.
    pub fn postings(&self, name: &str, value: &str) -> Result<ListPostings> {
        self.decode_postings(name, value).map_err(count_corruption)
    }

    fn decode_postings(&self, name: &str, value: &str) -> Result<ListPostings> {
        let key = join_key([name.as_bytes(), value.as_bytes()]);
        let off = *self
            .postings
            .get(&key)
            .ok_or_else(|| BlockError::NotFound(format!("postings for {name}={value}")))?;

        let payload = self.section(off)?.into_std_payload()?;
        if payload.len() % 4 != 0 {
            return Err(BlockError::InvalidSize);
        }
        let list = payload
            .chunks_exact(4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        block_metrics::record_postings_lookup();
        Ok(ListPostings::new(list))
    }

    /// Decodes the series record at `series_ref`, keeping only chunks that overlap
    /// `[mint, maxt]`.
    pub fn series(&self, series_ref: SeriesRef, mint: Timestamp, maxt: Timestamp) -> Result<SeriesLookup> {
        self.decode_series(series_ref, mint, maxt).map_err(|e| {
            block_metrics::record_decode_error();
            self.opts.event_listener.on_event(BlockEvent::SeriesDecodeFailed {
                series_ref,
                error: e.to_string(),
            });
            e
        })
    }

    fn decode_series(&self, series_ref: SeriesRef, mint: Timestamp, maxt: Timestamp) -> Result<SeriesLookup> {
        let mut d = Decbuf::at(&self.buf, series_ref as usize)?;

        let k = d.count(1)?;
        if k % 2 == 1 {
            return Err(BlockError::InvalidSize);
        }
        let mut labels = Vec::with_capacity(k / 2);
        for _ in 0..k / 2 {
            let n = d.uvarint32()?;
            let v = d.uvarint32()?;
            labels.push(Label {
                name: self.symbols.lookup_str(n)?,
                value: self.symbols.lookup_str(v)?,
            });
        }

        // Each entry needs at least one byte per field.
        let m = d.count(3)?;
        let mut chunks = Vec::with_capacity(m);
        let mut skipped = 0;
        for i in 0..m {
            let first = d.varint()?;
            // Entries are sorted by time; nothing after this one can overlap.
            if first > maxt {
                skipped += m - i;
                break;
            }
            let last = d.varint()?;
            let chunk_ref = d.uvarint32()?;
            if last < mint {
                skipped += 1;
                continue;
            }
            chunks.push(ChunkMeta {
                chunk_ref,
                min_time: first,
                max_time: last,
            });
        }

        block_metrics::record_series_decoded(chunks.len(), skipped);
        if chunks.is_empty() {
            return Ok(SeriesLookup::NotInRange);
        }
        Ok(SeriesLookup::Found(Series::new(labels, chunks, self.series.clone())))
    }

    /// Resolves the postings of `name=value` and decodes every referenced series in parallel.
    ///
    /// Results keep postings order; series with no chunk in range are dropped. The first
    /// decode error aborts the selection.
    pub fn select(&self, name: &str, value: &str, mint: Timestamp, maxt: Timestamp) -> Result<Vec<Series>> {
        let refs = self.postings(name, value)?.into_vec();
        let found = refs
            .par_iter()
            .map(|&r| self.series(r, mint, maxt))
            .collect::<Result<Vec<_>>>()?;
        Ok(found.into_iter().filter_map(SeriesLookup::into_option).collect())
    }
}

fn read_section(buf: &Bytes, offset: u32, opts: &ReaderOptions) -> Result<Section> {
    let s = Section::read(buf, offset)?;
    if opts.verify_checksums {
        if let Err(e) = s.verify() {
            if let BlockError::ChecksumMismatch {
                offset,
                expected,
                actual,
            } = e
            {
                opts.event_listener.on_event(BlockEvent::ChecksumMismatch {
                    offset,
                    expected,
                    actual,
                });
            }
            return Err(e);
        }
    }
    Ok(s)
}

/// Counts `e` as a decode error unless it is an expected miss.
fn count_corruption(e: BlockError) -> BlockError {
    if e.is_corruption() {
        block_metrics::record_decode_error();
    }
    e
}

fn join_key<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut key = Vec::new();
    for (i, p) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push(SEP);
        }
        key.extend_from_slice(p);
    }
    key
}
