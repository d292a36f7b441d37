// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Criterion benchmarks for pull-gated fanout delivery.
//!
//! The baseline feeds one bounded `tokio::sync::mpsc` channel per branch from a
//! single send loop. Both sides buffer the same number of chunks per branch,
//! but the baseline waits on the slowest branch while the fanout only waits
//! until some branch asks for more.

use std::hint::black_box;
use std::sync::Arc;

use benchmarks::make_payload;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fanout_engine::{pipe, Branch, BranchOptions, Fanout};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHUNKS: u64 = 10_000;
const PAYLOAD_SIZE: usize = 256;
const BRANCHES: [usize; 4] = [1, 2, 4, 8];
const HIGH_WATER_MARKS: [usize; 3] = [1, 16, 256];
const PIPE_CAPACITY: usize = 64;
const BRANCH_BUFFER: usize = 16;

type Chunk = Arc<Vec<u8>>;

fn drain_branch(mut branch: Branch<Chunk>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut read = 0u64;
        while let Ok(chunk) = branch.recv().await {
            _ = black_box(chunk.len());
            read += 1;
        }
        read
    })
}

fn drain_channel(mut rx: mpsc::Receiver<Chunk>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut read = 0u64;
        while let Some(chunk) = rx.recv().await {
            _ = black_box(chunk.len());
            read += 1;
        }
        read
    })
}

async fn total_read(readers: Vec<JoinHandle<u64>>) -> u64 {
    let mut total = 0;
    for reader in readers {
        total += reader.await.expect("reader task should not panic");
    }
    total
}

/// Writes `CHUNKS` chunks through a pipe into a fanout with `branches` readers.
async fn fanout_round(branches: usize, high_water_mark: usize) {
    let (writer, source) = pipe::<Chunk>(PIPE_CAPACITY);
    let fanout = Arc::new(Fanout::new(source));
    let readers: Vec<_> = (0..branches)
        .map(|_| {
            drain_branch(fanout.add_with_options(BranchOptions {
                high_water_mark: Some(high_water_mark),
            }))
        })
        .collect();
    let run = tokio::spawn({
        let fanout = Arc::clone(&fanout);
        async move { fanout.start().await }
    });

    let payload = make_payload(PAYLOAD_SIZE);
    for _ in 0..CHUNKS {
        writer
            .write(Arc::clone(&payload))
            .await
            .expect("pipe reader is alive");
    }
    drop(writer);
    run.await
        .expect("read loop should not panic")
        .expect("pipe source never fails");
    _ = fanout.close_all();

    assert_eq!(total_read(readers).await, CHUNKS * branches as u64);
}

/// Same workload with one bounded channel per branch, sent to in turn.
async fn bounded_channels_round(branches: usize, buffer: usize) {
    let (senders, receivers): (Vec<_>, Vec<_>) =
        (0..branches).map(|_| mpsc::channel::<Chunk>(buffer)).unzip();
    let readers: Vec<_> = receivers.into_iter().map(drain_channel).collect();

    let payload = make_payload(PAYLOAD_SIZE);
    for _ in 0..CHUNKS {
        for tx in &senders {
            tx.send(Arc::clone(&payload))
                .await
                .expect("channel reader is alive");
        }
    }
    drop(senders);

    assert_eq!(total_read(readers).await, CHUNKS * branches as u64);
}

fn bench_branch_count(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("fanout/branches");
    _ = group.throughput(Throughput::Elements(CHUNKS));

    for branches in BRANCHES {
        _ = group.bench_function(BenchmarkId::new("pull_gated", branches), |b| {
            b.to_async(&rt).iter(|| fanout_round(branches, BRANCH_BUFFER));
        });
        _ = group.bench_function(BenchmarkId::new("bounded_channels", branches), |b| {
            b.to_async(&rt)
                .iter(|| bounded_channels_round(branches, BRANCH_BUFFER));
        });
    }
    group.finish();
}

fn bench_high_water_mark(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("fanout/high_water_mark");
    _ = group.throughput(Throughput::Elements(CHUNKS));

    for high_water_mark in HIGH_WATER_MARKS {
        _ = group.bench_function(BenchmarkId::new("four_branches", high_water_mark), |b| {
            b.to_async(&rt).iter(|| fanout_round(4, high_water_mark));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_branch_count, bench_high_water_mark);
criterion_main!(benches);
