
use std::sync::{Arc, Mutex};

use block_fixture::{sample_block, sample_stats, write_block_dir, IndexBuilder, SeriesDataBuilder};
use bytes::Bytes;
use tsblock::telemetry::{BlockEvent, BlockEventListener};
use tsblock::{
    Block, BlockError, BlockSeriesReader, Chunk, ChunkMeta, IndexReader, Label, ReaderOptions,
    SeriesLookup, StringTuples,
};

fn open(index: Vec<u8>, series: Vec<u8>) -> IndexReader {
    let sr = Arc::new(BlockSeriesReader::new(Bytes::from(series)).unwrap());
    IndexReader::new(sr, Bytes::from(index)).unwrap()
}

fn meta(chunk_ref: u32, min_time: i64, max_time: i64) -> ChunkMeta {
    ChunkMeta {
        chunk_ref,
        min_time,
        max_time,
    }
}

#[derive(Debug, Default)]
struct Collect(Mutex<Vec<BlockEvent>>);

impl BlockEventListener for Collect {
    fn on_event(&self, event: BlockEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[test]
fn test_stats_round_trip_through_fixture() {
    let (ix, sd, _) = sample_block();
    let r = open(ix, sd);
    assert_eq!(r.stats().unwrap(), sample_stats());
}

#[test]
fn test_series_time_filtering() {
    let (ix, sd, refs) = sample_block();
    let r = open(ix, sd);
    let [c0, c1, c2] = refs.chunks;

    let s = r.series(refs.api_a, 15, 25).unwrap().into_option().unwrap();
    assert_eq!(s.chunks(), &[meta(c1, 11, 20), meta(c2, 21, 30)]);
    assert_eq!(
        s.labels(),
        &vec![Label::new("job", "api"), Label::new("instance", "a")]
    );

    assert!(matches!(
        r.series(refs.api_a, 31, 100).unwrap(),
        SeriesLookup::NotInRange
    ));

    let s = r.series(refs.api_a, 0, 5).unwrap().into_option().unwrap();
    assert_eq!(s.chunks(), &[meta(c0, 0, 10)]);

    // Closed interval on both ends.
    let s = r.series(refs.api_a, 10, 11).unwrap().into_option().unwrap();
    assert_eq!(s.chunks(), &[meta(c0, 0, 10), meta(c1, 11, 20)]);
}

#[test]
fn test_series_stops_at_first_chunk_after_range() {
    let mut ix = IndexBuilder::new(sample_stats());
    // Hand-written record: one label pair, 3 declared chunks, but only the first two
    // entries are well formed; the rest is garbage that must never be read.
    let job = ix.symbol("job");
    let api = ix.symbol("api");
    let mut rec = vec![2u8, job as u8, api as u8, 3];
    rec.extend_from_slice(&[0, 20, 4]); // first=0 last=10 ref=4
    rec.extend_from_slice(&[22]); // first=11
    rec.extend_from_slice(&[0xff; 20]);
    assert!(job < 0x80 && api < 0x80);
    let sref = ix.raw(&rec);
    let r = open(ix.finish(), SeriesDataBuilder::default().finish());

    let s = r.series(sref, 0, 5).unwrap().into_option().unwrap();
    assert_eq!(s.chunks(), &[meta(4, 0, 10)]);
    assert_eq!(s.labels(), &vec![Label::new("job", "api")]);

    // Without the early stop the garbage is decoded and fails.
    assert!(matches!(r.series(sref, 0, 15), Err(BlockError::InvalidSize)));
}

#[test]
fn test_series_rejects_odd_symbol_count_and_out_of_range_refs() {
    let mut ix = IndexBuilder::new(sample_stats());
    let job = ix.symbol("job");
    let odd = ix.raw(&[1, job as u8, 0]);
    let r = open(ix.finish(), SeriesDataBuilder::default().finish());

    assert!(matches!(r.series(odd, 0, 10), Err(BlockError::InvalidSize)));
    assert!(matches!(
        r.series(r.size() as u32 + 1, 0, 10),
        Err(BlockError::InvalidSize)
    ));
}

#[test]
fn test_symbol_interning_yields_equal_labels() {
    let (ix, sd, refs) = sample_block();
    let r = open(ix, sd);
    let a = r.series(refs.api_a, 0, 100).unwrap().into_option().unwrap();
    let b = r.series(refs.db_a, 0, 100).unwrap().into_option().unwrap();
    // Both records point at the same "instance" and "a" symbols.
    assert_eq!(a.labels()[1], b.labels()[1]);
    assert_eq!(a.labels()[1], Label::new("instance", "a"));
}

#[test]
fn test_postings_are_returned_exactly() {
    let mut ix = IndexBuilder::new(sample_stats());
    ix.postings("k", "v", &[3, 1, 4, 1, 5, 9]);
    let r = open(ix.finish(), SeriesDataBuilder::default().finish());

    let p = r.postings("k", "v").unwrap();
    assert_eq!(p.collect::<Vec<_>>(), vec![3, 1, 4, 1, 5, 9]);

    let mut p = r.postings("k", "v").unwrap();
    assert_eq!(p.at(), None);
    assert!(p.advance());
    assert_eq!(p.at(), Some(3));

    assert!(r.postings("k", "w").unwrap_err().is_not_found());
}

#[test]
fn test_label_values_and_indices() {
    let (ix, sd, _) = sample_block();
    let r = open(ix, sd);

    let t = r.label_values(&["job"]).unwrap();
    assert!(matches!(t, StringTuples::Serialized(_)));
    assert_eq!(t.arity(), 1);
    assert_eq!(t.len(), 2);
    assert_eq!(t.at(1).unwrap(), vec!["db".to_string()]);

    let t = r.label_values(&["job", "instance"]).unwrap();
    assert_eq!(t.len(), 3);
    let all: Vec<Vec<String>> = t.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(
        all,
        vec![
            vec!["api".to_string(), "a".to_string()],
            vec!["api".to_string(), "b".to_string()],
            vec!["db".to_string(), "a".to_string()],
        ]
    );

    assert_eq!(
        r.label_indices().unwrap(),
        vec![
            vec!["instance".to_string()],
            vec!["job".to_string()],
            vec!["job".to_string(), "instance".to_string()],
        ]
    );

    let err = r.label_values(&["zone"]).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_label_values_errors_carry_section_offset() {
    let mut ix = IndexBuilder::new(sample_stats());
    // Declared length far past the end of the buffer.
    let bad = ix.raw(&[1, 0xff, 0xff, 0xff, 0xff]);
    ix.label_index_at(&["job"], bad);
    let zero_arity = {
        let mut b = Vec::new();
        tsblock::encoding::write_section(&mut b, tsblock::encoding::FLAG_STD, &[0]);
        ix.raw(&b)
    };
    ix.label_index_at(&["zone"], zero_arity);
    let r = open(ix.finish(), SeriesDataBuilder::default().finish());

    match r.label_values(&["job"]).unwrap_err() {
        BlockError::Section { offset, source } => {
            assert_eq!(offset, bad);
            assert!(matches!(*source, BlockError::InvalidSize));
        }
        other => panic!("expected section error, got {other:?}"),
    }
    assert!(matches!(
        r.label_values(&["zone"]),
        Err(BlockError::InvalidSize)
    ));
}

#[test]
fn test_series_chunks_are_fetched_lazily() {
    let (ix, sd, refs) = sample_block();
    let r = open(ix, sd);
    let s = r.series(refs.api_a, 0, 100).unwrap().into_option().unwrap();
    let payloads: Vec<(u8, Vec<u8>)> = s
        .chunks()
        .iter()
        .map(|m| {
            let c = s.chunk(m).unwrap();
            (c.encoding(), c.bytes().to_vec())
        })
        .collect();
    assert_eq!(
        payloads,
        vec![
            (1, b"chunk-0".to_vec()),
            (1, b"chunk-1".to_vec()),
            (0, b"chunk-2!".to_vec())
        ]
    );
}

#[test]
fn test_select_keeps_postings_order_and_drops_out_of_range() {
    let (ix, sd, _) = sample_block();
    let r = open(ix, sd);

    let all = r.select("job", "api", 0, 100).unwrap();
    let instances: Vec<&str> = all.iter().map(|s| s.labels()[1].value.as_str()).collect();
    assert_eq!(instances, vec!["a", "b"]);

    let early = r.select("job", "api", 0, 20).unwrap();
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].labels()[1].value, "a");

    assert!(r.select("job", "nope", 0, 1).unwrap_err().is_not_found());
}

#[test]
fn test_checksum_verification_is_opt_in() {
    let (mut ix, sd, _) = sample_block();
    // Flip one byte inside the stats payload.
    ix[8 + 5 + 40] ^= 0x01;

    let r = open(ix.clone(), sd.clone());
    r.stats().unwrap();

    let events = Arc::new(Collect::default());
    let opts = ReaderOptions::default()
        .with_verify_checksums(true)
        .with_event_listener(events.clone());
    let sr = Arc::new(BlockSeriesReader::new(Bytes::from(sd)).unwrap());
    let r = IndexReader::with_options(sr, Bytes::from(ix), &opts).unwrap();

    let err = r.stats().unwrap_err();
    assert!(matches!(err, BlockError::ChecksumMismatch { offset: 8, .. }));
    assert!(err.is_corruption());

    let seen = events.0.lock().unwrap();
    assert!(matches!(seen[0], BlockEvent::IndexOpened { .. }));
    assert!(matches!(
        seen.last(),
        Some(BlockEvent::ChecksumMismatch { offset: 8, .. })
    ));
}

#[test]
fn test_open_failure_emits_event() {
    let events = Arc::new(Collect::default());
    let opts = ReaderOptions::default().with_event_listener(events.clone());
    let sr = Arc::new(BlockSeriesReader::new(Bytes::from(SeriesDataBuilder::default().finish())).unwrap());
    assert!(IndexReader::with_options(sr, Bytes::from(vec![0u8; 32]), &opts).is_err());
    assert!(matches!(
        events.0.lock().unwrap()[0],
        BlockEvent::IndexOpenFailed { .. }
    ));
}

#[test]
fn test_block_open_from_directory() {
    let (ix, sd, refs) = sample_block();
    let dir = tempfile::tempdir().unwrap();
    write_block_dir(dir.path(), &ix, &sd);

    let block = Block::open(dir.path()).unwrap();
    assert_eq!(block.dir(), dir.path());
    assert_eq!(block.index().stats().unwrap(), sample_stats());
    assert_eq!(block.series_reader().size(), sd.len());

    let s = block
        .index()
        .series(refs.api_b, 0, 100)
        .unwrap()
        .into_option()
        .unwrap();
    assert_eq!(s.chunk(&s.chunks()[0]).unwrap().bytes(), b"chunk-2!");
}
