//! Stackchain Capture Benchmarks
//!
//! Run the benchmarks with:
//!
//! ```text
//! $ cargo bench -p stackchain-core
//! ```
//!
//! We have the following tests:
//! * [`capture`]: capturing a raw trace, at a shallow and a deep stack
//! * [`resolve`]: symbolizing a fresh trace, and reading a cached one
//! * [`launched`]: capturing and resolving inside a launched thread

use std::hint::black_box;
use std::sync::mpsc;

use criterion::{criterion_group, criterion_main, Criterion};
use stackchain_core::{Carrier, Trace, Tracer};

/// Captures at the bottom of a recursion `depth` calls deep.
#[inline(never)]
fn capture_at_depth(tracer: &Tracer, carrier: &Carrier, depth: usize) -> Trace {
    if depth == 0 {
        return tracer.capture(carrier);
    }
    black_box(capture_at_depth(tracer, carrier, depth - 1))
}

/// Tests the cost of a capture, which only records addresses.
///
/// The deep variant walks beyond the inline frame buffer and spills to the
/// heap.
fn capture(c: &mut Criterion) {
    let tracer = Tracer::default();
    let carrier = Carrier::new();
    let mut group = c.benchmark_group("capture");

    group.bench_function("shallow", |b| {
        b.iter(|| capture_at_depth(&tracer, &carrier, 0))
    });
    group.bench_function("deep", |b| {
        b.iter(|| capture_at_depth(&tracer, &carrier, 150))
    });

    group.finish();
}

/// Tests resolving a trace, both the first time and from the cache.
fn resolve(c: &mut Criterion) {
    let tracer = Tracer::default();
    let carrier = Carrier::new();
    let mut group = c.benchmark_group("resolve");

    group.bench_function("fresh", |b| {
        b.iter(|| capture_at_depth(&tracer, &carrier, 10).frames().len())
    });
    group.bench_function("cached", |b| {
        let trace = capture_at_depth(&tracer, &carrier, 10);
        b.iter(|| trace.frames().len())
    });
    group.bench_function("format", |b| {
        let trace = capture_at_depth(&tracer, &carrier, 10);
        b.iter(|| trace.format(true))
    });

    group.finish();
}

/// Tests resolving a trace captured in a launched thread, which walks the
/// chain into the launch site.
fn launched(c: &mut Criterion) {
    let tracer = Tracer::default();
    let worker = tracer.clone();
    let (sender, receiver) = mpsc::channel();
    tracer
        .launch(&Carrier::new(), move |carrier| {
            let _ = sender.send(worker.capture(&carrier));
        })
        .expect("spawned thread")
        .join()
        .expect("joined thread");
    let trace = receiver.recv().expect("trace from launched thread");

    c.bench_function("launched-resolve", |b| {
        b.iter(|| stackchain_core::resolve(&trace).len())
    });
}

criterion_group!(benches, capture, resolve, launched);
criterion_main!(benches);
