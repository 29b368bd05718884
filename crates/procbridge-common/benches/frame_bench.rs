// Criterion benchmarks for the procbridge frame codec
//
// Run benchmarks with:
//   cargo bench -p procbridge-common

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use procbridge_common::transport::FrameCodec;
use procbridge_common::Request;
use serde_json::json;

fn sample_requests() -> Vec<(&'static str, Request)> {
    let data: Vec<String> = (0..100).map(|i| format!("item_{}", i)).collect();
    vec![
        ("small", Request::new("method", json!({"value": 42}))),
        (
            "medium",
            Request::new("method", json!({"values": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]})),
        ),
        ("large", Request::new("method", json!({ "data": data }))),
    ]
}

fn bench_frame_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encoding");

    for (name, request) in sample_requests() {
        group.bench_function(format!("encode_{}", name), |b| {
            b.iter(|| {
                let mut buf = Vec::new();
                FrameCodec::write_request(&mut buf, black_box(&request)).unwrap();
                buf
            });
        });
    }

    group.finish();
}

fn bench_frame_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decoding");

    for (name, request) in sample_requests() {
        let mut buf = Vec::new();
        FrameCodec::write_request(&mut buf, &request).unwrap();

        group.bench_function(format!("decode_{}", name), |b| {
            b.iter(|| FrameCodec::read_request(&mut Cursor::new(black_box(&buf))).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_frame_encoding, bench_frame_decoding);
criterion_main!(benches);
