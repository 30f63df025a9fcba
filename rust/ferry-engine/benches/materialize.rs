//! Benchmarks for the engine-thread half of async dispatch.
//!
//! Measures argument extraction and result materialization, the two steps
//! that run on the engine thread for every async call.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ferry_core::{AsyncArgs, TypedResult};
use ferry_engine::{Realm, Value};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A directory listing of `n` entries, shaped like `listDirectory` output.
fn listing(n: usize) -> TypedResult {
    TypedResult::List(
        (0..n)
            .map(|i| {
                TypedResult::map([
                    ("path", format!("/data/file-{}.txt", i).into()),
                    ("name", format!("file-{}.txt", i).into()),
                    ("type", 1.into()),
                    ("size", (i * 128).into()),
                ])
            })
            .collect(),
    )
}

fn request_args() -> Vec<Value> {
    vec![
        Value::string("https://example.test/upload"),
        Value::string("POST"),
        Value::array(
            (0..16)
                .map(|i| Value::string(&format!("x-header-{}", i)))
                .collect(),
        ),
        Value::buffer(vec![7u8; 64 * 1024]),
        Value::Number(30000.0),
        Value::Bool(true),
    ]
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_materialize(c: &mut Criterion) {
    let mut realm = Realm::new();
    let small = listing(10);
    let large = listing(1_000);
    let bytes = TypedResult::Bytes(vec![0u8; 1 << 20]);

    c.bench_function("materialize_listing_10", |b| {
        b.iter(|| black_box(small.clone().materialize(&mut realm)))
    });
    c.bench_function("materialize_listing_1000", |b| {
        b.iter(|| black_box(large.clone().materialize(&mut realm)))
    });
    c.bench_function("materialize_bytes_1mib", |b| {
        b.iter(|| black_box(bytes.clone().materialize(&mut realm)))
    });
}

fn bench_extract(c: &mut Criterion) {
    let realm = Realm::new();
    let args = request_args();
    c.bench_function("extract_request_args", |b| {
        b.iter(|| black_box(AsyncArgs::extract(&realm, black_box(&args))))
    });
}

criterion_group!(benches, bench_materialize, bench_extract);
criterion_main!(benches);
