//! Criterion benchmarks for the forwarding filter.
//!
//! Every framed message passes through `PatternFilter::matches`, so this is
//! on the per-message hot path of every connection.
//!
//! Run with:
//! ```bash
//! cargo bench --package vam-core --bench filter_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vam_core::PatternFilter;

fn bench_matches(c: &mut Criterion) {
    let filter = PatternFilter::new();
    let long_miss = "x".repeat(256);
    let inputs: Vec<(&str, &str)> = vec![
        ("match_short", "generic042"),
        ("match_suffix", "generic042-start-sequence-now"),
        ("miss_two_digits", "generic42"),
        ("miss_plain", "hello world"),
        ("miss_256_bytes", long_miss.as_str()),
    ];

    let mut group = c.benchmark_group("pattern_filter");
    for (name, input) in inputs {
        group.bench_with_input(BenchmarkId::new("matches", name), &input, |b, input| {
            b.iter(|| filter.matches(black_box(input)))
        });
    }
    group.finish();
}

fn bench_construct(c: &mut Criterion) {
    c.bench_function("pattern_filter_new", |b| b.iter(PatternFilter::new));
}

criterion_group!(benches, bench_matches, bench_construct);
criterion_main!(benches);
