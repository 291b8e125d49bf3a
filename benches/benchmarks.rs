
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;
use tsblock::{BlockSeriesReader, IndexReader, ReaderOptions, SeriesReader};

fn open(block: &datasets::GeneratedBlock, opts: &ReaderOptions) -> IndexReader {
    let sr = Arc::new(BlockSeriesReader::new(Bytes::from(block.series.clone())).expect("series reader"));
    IndexReader::with_options(sr, Bytes::from(block.index.clone()), opts).expect("index reader")
}

fn bench_open(c: &mut Criterion) {
    let block = datasets::generate_block(datasets::DEFAULT_SEED, 2_000, 8, 4, 64);

    let mut group = c.benchmark_group("open");
    for (name, verify) in [("no_checksums", false), ("verify_checksums", true)] {
        let opts = ReaderOptions::default().with_verify_checksums(verify);
        group.bench_function(format!("index_2k_series_{}", name), |b| {
            b.iter_batched(
                || {
                    (
                        Arc::new(BlockSeriesReader::new(Bytes::from(block.series.clone())).unwrap()),
                        Bytes::from(block.index.clone()),
                    )
                },
                |(sr, ix)| IndexReader::with_options(sr, black_box(ix), &opts).unwrap(),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_series_decode(c: &mut Criterion) {
    let block = datasets::generate_block(datasets::DEFAULT_SEED, 2_000, 32, 4, 64);
    let r = open(&block, &ReaderOptions::default());
    let mid = block.max_time / 2;

    let mut group = c.benchmark_group("series");
    group.bench_function("decode_all_full_range", |b| {
        b.iter(|| {
            for &sref in &block.series_refs {
                let _ = r.series(black_box(sref), i64::MIN, i64::MAX).unwrap();
            }
        })
    });
    // Early stop: only the first chunks are in range.
    group.bench_function("decode_all_head_window", |b| {
        b.iter(|| {
            for &sref in &block.series_refs {
                let _ = r.series(black_box(sref), 0, black_box(100_000)).unwrap();
            }
        })
    });
    group.bench_function("select_mid_window", |b| {
        b.iter(|| {
            let s = r.select("job", "bench", black_box(mid), black_box(mid + 200_000)).unwrap();
            black_box(s.len())
        })
    });
    group.finish();
}

fn bench_postings_and_chunks(c: &mut Criterion) {
    let block = datasets::generate_block(datasets::DEFAULT_SEED, 5_000, 4, 4, 16);
    let r = open(&block, &ReaderOptions::default());
    let sr = BlockSeriesReader::new(Bytes::from(block.series.clone())).unwrap();
    let s = r
        .series(block.series_refs[0], i64::MIN, i64::MAX)
        .unwrap()
        .into_option()
        .unwrap();
    let refs: Vec<u32> = s.chunks().iter().map(|m| m.chunk_ref).collect();

    let mut group = c.benchmark_group("lookup");
    group.bench_function("postings_high_cardinality_pair", |b| {
        b.iter(|| r.postings(black_box("k0"), black_box("v0")).unwrap().count())
    });
    group.bench_function("postings_seek", |b| {
        let target = block.series_refs[block.series_refs.len() / 2];
        b.iter(|| {
            let mut p = r.postings("job", "bench").unwrap();
            black_box(p.seek(black_box(target)))
        })
    });
    group.bench_function("chunk_read", |b| {
        b.iter(|| {
            for &cr in &refs {
                black_box(sr.chunk(black_box(cr)).unwrap());
            }
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_open,
    bench_series_decode,
    bench_postings_and_chunks
);
criterion_main!(benches);
