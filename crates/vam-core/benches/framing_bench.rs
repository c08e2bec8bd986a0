//! Criterion benchmarks for the frame decoders and text decoding.
//!
//! Run with:
//! ```bash
//! cargo bench --package vam-core --bench framing_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vam_core::framing::{ChunkDecoder, FrameDecoder, LineDecoder};
use vam_core::{decode_text, PatternFilter};

/// 64 newline-terminated messages, half of them matching the filter.
fn make_line_stream() -> Vec<u8> {
    let mut stream = Vec::new();
    for i in 0..64 {
        if i % 2 == 0 {
            stream.extend_from_slice(format!("generic{:03}-event\n", i).as_bytes());
        } else {
            stream.extend_from_slice(b"status: idle\r\n");
        }
    }
    stream
}

fn bench_line_decoder(c: &mut Criterion) {
    let stream = make_line_stream();
    let mut group = c.benchmark_group("line_decoder");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    // Feed the stream in read-sized pieces, as a connection would.
    for read_size in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("read_size", read_size), &read_size, |b, &rs| {
            b.iter(|| {
                let mut decoder = LineDecoder::new(rs, 4096);
                let mut buf = Vec::with_capacity(rs);
                let mut frames = 0usize;
                for piece in stream.chunks(rs) {
                    buf.extend_from_slice(piece);
                    while let Ok(Some(frame)) = decoder.decode(&mut buf) {
                        black_box(&frame);
                        frames += 1;
                    }
                }
                frames
            })
        });
    }
    group.finish();
}

fn bench_chunk_decoder(c: &mut Criterion) {
    let chunk = vec![b'a'; 256];
    c.bench_function("chunk_decoder_256", |b| {
        let mut decoder = ChunkDecoder::new(256);
        b.iter(|| {
            let mut buf = chunk.clone();
            decoder.decode(black_box(&mut buf)).ok()
        })
    });
}

/// Framing, text decoding and filtering together: the full per-message path.
fn bench_pipeline(c: &mut Criterion) {
    let stream = make_line_stream();
    let filter = PatternFilter::new();
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("newline_decode_filter", |b| {
        b.iter(|| {
            let mut decoder = LineDecoder::new(256, 4096);
            let mut buf = stream.clone();
            let mut forwarded = 0usize;
            while let Ok(Some(frame)) = decoder.decode(&mut buf) {
                if let Ok(msg) = decode_text(&frame) {
                    if filter.matches(msg.as_str()) {
                        forwarded += 1;
                    }
                }
            }
            black_box(forwarded)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_line_decoder, bench_chunk_decoder, bench_pipeline);
criterion_main!(benches);
