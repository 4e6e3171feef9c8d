//! Benchmarks for stream filters and content tokenizing.
//!
//! Benchmark groups:
//! - `filters_decode`: Flate, LZW, ASCII85 and RunLength throughput
//! - `png_predictor`: Row reconstruction after Flate
//! - `content_lexer`: Tokenizing synthetic page content

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use folio_core::codec::{
    PredictorParams, ascii85decode, ascii85encode, flatedecode, lzwdecode, png_predict, rldecode,
    rlencode, unpredict,
};
use folio_core::content::ContentLexer;
use std::hint::black_box;
use std::io::Write;

/// Page-like content: text, paths and colour changes cycling.
fn generate_content(n: usize) -> Vec<u8> {
    let templates: &[&[u8]] = &[
        b"BT /F1 12 Tf 72 700 Td (Hello World) Tj ET\n",
        b"q 1 0 0 1 36 36 cm 0 0 100 50 re f Q\n",
        b"0.5 0.25 0 rg 10 10 m 20 30 l 40 10 l h S\n",
        b"[(Kern) -120 (ed)] TJ\n",
        b"/GS1 gs <48454C4C4F> Tj\n",
    ];
    let mut data = Vec::with_capacity(n * 40);
    for i in 0..n {
        data.extend_from_slice(templates[i % templates.len()]);
    }
    data
}

/// Compressible bytes with short repeats, like decoded image rows.
fn generate_samples(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i / 7) % 251) as u8).collect()
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// PDF-flavoured LZW (MSB first, early change) so the decoder has input.
fn lzw_encode(data: &[u8]) -> Vec<u8> {
    let mut encoder = weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
    encoder.encode(data).unwrap()
}

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters_decode");
    for len in [4 * 1024, 256 * 1024] {
        let raw = generate_samples(len);
        group.throughput(Throughput::Bytes(len as u64));

        let flate = zlib(&raw);
        group.bench_with_input(BenchmarkId::new("flate", len), &flate, |b, data| {
            b.iter(|| flatedecode(black_box(data)).unwrap())
        });

        let lzw = lzw_encode(&raw);
        group.bench_with_input(BenchmarkId::new("lzw", len), &lzw, |b, data| {
            b.iter(|| lzwdecode(black_box(data)).unwrap())
        });

        let a85 = ascii85encode(&raw);
        group.bench_with_input(BenchmarkId::new("ascii85", len), &a85, |b, data| {
            b.iter(|| ascii85decode(black_box(data)).unwrap())
        });

        let rl = rlencode(&raw);
        group.bench_with_input(BenchmarkId::new("runlength", len), &rl, |b, data| {
            b.iter(|| rldecode(black_box(data)).unwrap())
        });
    }
    group.finish();
}

fn bench_predictor(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_predictor");
    let params = PredictorParams {
        predictor: 15,
        colors: 3,
        bits_per_component: 8,
        columns: 512,
    };
    let image = generate_samples(params.row_bytes().expect("row size") * 256);
    for tag in [1u8, 2, 4] {
        let encoded = png_predict(&image, &params, tag).unwrap();
        group.throughput(Throughput::Bytes(image.len() as u64));
        group.bench_with_input(BenchmarkId::new("tag", tag), &encoded, |b, data| {
            b.iter(|| unpredict(black_box(data.clone()), &params).unwrap())
        });
    }
    group.finish();
}

fn bench_content_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_lexer");
    for n in [100, 1_000, 10_000] {
        let data = generate_content(n);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("lines", n), &data, |b, data| {
            b.iter(|| {
                let mut count = 0usize;
                for token in ContentLexer::new(black_box(data.clone())) {
                    black_box(token.unwrap());
                    count += 1;
                }
                count
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_filters, bench_predictor, bench_content_lexer);
criterion_main!(benches);
