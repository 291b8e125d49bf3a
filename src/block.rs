//! Loads a block directory (`index` + `series` files) into memory.

use crate::chunks::BlockSeriesReader;
use crate::error::Result;
use crate::index::IndexReader;
use crate::options::ReaderOptions;
use crate::telemetry::{block_metrics, BlockEvent};

use bytes::Bytes;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const INDEX_FILE: &str = "index";
pub const SERIES_FILE: &str = "series";

/// Both readers of one block, sharing the loaded series buffer.
#[derive(Debug, Clone)]
pub struct Block {
    dir: PathBuf,
    index: IndexReader,
    series: Arc<BlockSeriesReader>,
}

impl Block {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with_options(dir, &ReaderOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(dir: P, opts: &ReaderOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let series_buf = Bytes::from(fs::read(dir.join(SERIES_FILE))?);
        let index_buf = Bytes::from(fs::read(dir.join(INDEX_FILE))?);

        let series = match BlockSeriesReader::new(series_buf) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                block_metrics::record_decode_error();
                opts.event_listener.on_event(BlockEvent::SeriesReaderOpenFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };
        let index = IndexReader::with_options(series.clone(), index_buf, opts)?;

        Ok(Self { dir, index, series })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index(&self) -> &IndexReader {
        &self.index
    }

    pub fn series_reader(&self) -> &Arc<BlockSeriesReader> {
        &self.series
    }
}
