// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Arbiter fast-path throughput: the per-packet consultation that gates
//! whether any further per-body work happens at all (§4.D).

use arcafeed::{Arbiter, Side};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_in_sequence_fast_path(c: &mut Criterion) {
    c.bench_function("arbiter_in_sequence_publish", |b| {
        let mut arbiter = Arbiter::new();
        let mut seq = 1u64;
        b.iter(|| {
            let (decision, _events) = arbiter.need_to_publish(Side::Primary, black_box(seq));
            seq += 1;
            black_box(decision);
        });
    });
}

fn bench_duplicate_on_secondary_mirror(c: &mut Criterion) {
    c.bench_function("arbiter_secondary_duplicate", |b| {
        let mut arbiter = Arbiter::new();
        for seq in 1..=1000u64 {
            arbiter.need_to_publish(Side::Primary, seq);
        }
        let mut seq = 1u64;
        b.iter(|| {
            let (decision, _events) = arbiter.need_to_publish(Side::Secondary, black_box(seq % 1000 + 1));
            seq += 1;
            black_box(decision);
        });
    });
}

fn bench_gap_then_fill(c: &mut Criterion) {
    c.bench_function("arbiter_gap_open_and_fill", |b| {
        b.iter(|| {
            let mut arbiter = Arbiter::new();
            arbiter.need_to_publish(Side::Primary, 1);
            arbiter.need_to_publish(Side::Primary, black_box(3));
            let (decision, _events) = arbiter.need_to_publish(Side::Secondary, black_box(2));
            black_box(decision);
        });
    });
}

criterion_group!(benches, bench_in_sequence_fast_path, bench_duplicate_on_secondary_mirror, bench_gap_then_fill);
criterion_main!(benches);
