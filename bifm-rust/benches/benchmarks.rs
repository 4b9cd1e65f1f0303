use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bifm_rust::ibf::{BinCount, BinIndex, BinSize, BloomWords, HashFunctionCount, InterleavedBloomFilter};
use bifm_rust::index::{sa, BiFmIndex, IndexConfig};
use bifm_rust::search::{search, HitStrategy, MaxError, SearchConfig};

fn make_reference(len: usize) -> Vec<u8> {
    let mut seq = Vec::with_capacity(len);
    let mut x: u32 = 42;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(((x >> 16) % 4) as u8);
    }
    seq
}

/// 从参考序列截取查询，并在中间位置做一次替换
fn make_queries(reference: &[u8], n: usize, len: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| {
            let start = (i * 7919) % (reference.len() - len);
            let mut q = reference[start..start + len].to_vec();
            q[len / 2] = (q[len / 2] + 1) % 4;
            q
        })
        .collect()
}

fn bench_sa_build(c: &mut Criterion) {
    let mut text: Vec<u8> = make_reference(50_000).iter().map(|&r| r + 1).collect();
    text.push(0);

    c.bench_function("sa_build_50k", |b| {
        b.iter(|| black_box(sa::build_sa(black_box(&text))));
    });
}

fn bench_cursor_extend(c: &mut Criterion) {
    let reference = make_reference(100_000);
    let index = BiFmIndex::from_texts(&[&reference], IndexConfig::default()).unwrap();
    let pattern = reference[5_000..5_032].to_vec();

    c.bench_function("cursor_extend_right_32bp", |b| {
        b.iter(|| {
            let mut cur = index.cursor();
            black_box(cur.extend_right_seq(black_box(&pattern)));
            black_box(cur.count())
        });
    });

    c.bench_function("cursor_extend_left_32bp", |b| {
        b.iter(|| {
            let mut cur = index.cursor();
            black_box(cur.extend_left_seq(black_box(&pattern)));
            black_box(cur.count())
        });
    });
}

fn bench_search_schemes(c: &mut Criterion) {
    let reference = make_reference(100_000);
    let index = BiFmIndex::from_texts(&[&reference], IndexConfig::default()).unwrap();
    let queries = make_queries(&reference, 100, 50);

    let mut group = c.benchmark_group("search_scheme_100x50bp");
    for errors in 0..=3u8 {
        let config = SearchConfig::new().max_error(MaxError::total(errors)).hit(HitStrategy::All);
        group.bench_with_input(BenchmarkId::from_parameter(errors), &config, |b, config| {
            b.iter(|| black_box(search(&index, black_box(&queries), config).unwrap()));
        });
    }
    group.finish();

    let config = SearchConfig::new().max_error(MaxError::total(2)).hit(HitStrategy::Best);
    c.bench_function("search_scheme_best_2err", |b| {
        b.iter(|| black_box(search(&index, black_box(&queries), &config).unwrap()));
    });
}

fn bench_ibf(c: &mut Criterion) {
    let mut ibf = InterleavedBloomFilter::new(BinCount(1024), BinSize(1 << 16), HashFunctionCount(2)).unwrap();
    for v in 0..100_000u64 {
        ibf.emplace(v.wrapping_mul(0x9E37_79B9_7F4A_7C15), BinIndex((v % 1024) as usize));
    }
    let values: Vec<u64> = (0..1_000u64).map(|v| v.wrapping_mul(0x9E37_79B9_7F4A_7C15)).collect();

    let mut membership = ibf.membership_agent();
    c.bench_function("ibf_bulk_contains_1024_bins", |b| {
        b.iter(|| {
            for &v in &values {
                black_box(membership.bulk_contains(black_box(v)));
            }
        });
    });

    let mut counting = ibf.counting_agent::<u16>();
    c.bench_function("ibf_bulk_count_1024_bins", |b| {
        b.iter(|| black_box(counting.bulk_count(values.iter().copied()).len()));
    });

    let compressed = ibf.compress();
    let mut counting = compressed.counting_agent::<u16>();
    c.bench_function("compressed_ibf_bulk_count_1024_bins", |b| {
        b.iter(|| black_box(counting.bulk_count(values.iter().copied()).len()));
    });
}

criterion_group!(benches, bench_sa_build, bench_cursor_extend, bench_search_schemes, bench_ibf);
criterion_main!(benches);
