//! Performance benchmarks for the aggregation engine.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use devfeed::{
    flatten, AggregationContext, IssueTracker, MemoryLayoutStore, MessageBuffer, MessageId,
    MessageRecord, MessageTag,
};
use serde_json::json;
use std::sync::Arc;

fn record(id: u64) -> MessageRecord {
    MessageRecord::new(MessageId(id), MessageTag::Metro, json!({ "n": id }))
}

/// Benchmark flattening with varying buffer sizes and repeat ratios.
fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");

    for size in [100u64, 1_000, 10_000] {
        // Half the entries repeat an earlier identity.
        let entries: Vec<_> = (0..size)
            .map(|i| (devfeed::Cursor(i + 1), record(i % (size / 2).max(1))))
            .collect();

        group.bench_with_input(BenchmarkId::new("entries", size), &entries, |b, entries| {
            b.iter(|| black_box(flatten(entries)));
        });
    }

    group.finish();
}

/// Benchmark append throughput on an unbounded in-memory buffer.
fn bench_append(c: &mut Criterion) {
    c.bench_function("append", |b| {
        let buffer = MessageBuffer::new();
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            buffer.append(record(id)).unwrap();
        });
    });
}

/// Benchmark a cached connection read: repeated reads without appends must
/// not rescan the buffer.
fn bench_connection_read(c: &mut Criterion) {
    let buffer = Arc::new(MessageBuffer::new());
    let context = AggregationContext::new(
        "./bench",
        Arc::clone(&buffer),
        Arc::new(MemoryLayoutStore::new()),
        Arc::new(IssueTracker::new()),
    );

    for id in 0..10_000u64 {
        buffer.append(record(id % 5_000)).unwrap();
    }

    c.bench_function("connection_read_cached", |b| {
        let process = context.process_source();
        b.iter(|| black_box(context.message_connection(Some(&process))));
    });
}

criterion_group!(benches, bench_flatten, bench_append, bench_connection_read);
criterion_main!(benches);
