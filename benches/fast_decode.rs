// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! FAST decode throughput: the hot path every multiplexed Add/Modify/Delete
//! body goes through per §4.B.

use arcafeed::fast::{self, FastFieldState};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn encode_pmap(bits: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut i = 0;
    while i < bits.len() {
        let mut byte = 0u8;
        for k in 0..7 {
            if bits.get(i + k).copied().unwrap_or(false) {
                byte |= 0x40 >> k;
            }
        }
        bytes.push(byte);
        i += 7;
    }
    if let Some(last) = bytes.last_mut() {
        *last |= 0x80;
    } else {
        bytes.push(0x80);
    }
    bytes
}

fn encode_u32(v: u32) -> Vec<u8> {
    let mut groups = Vec::new();
    let mut val = v;
    loop {
        groups.push((val & 0x7F) as u8);
        val >>= 7;
        if val == 0 {
            break;
        }
    }
    groups.reverse();
    let n = groups.len();
    for (i, g) in groups.iter_mut().enumerate() {
        if i == n - 1 {
            *g |= 0x80;
        }
    }
    groups
}

/// A fully-populated add-order (type 100) FAST message, every field present.
fn full_add_order() -> Vec<u8> {
    let mut src = encode_pmap(&[true; 13]);
    src.extend(encode_u32(100)); // msg type
    for v in [7u32, 1, 123456, 999, 100, 5000, 2, 1, 1, 1, 10, 3] {
        src.extend(encode_u32(v));
    }
    src
}

/// A same-packet follow-up add-order with only SEQUENCE present, every other
/// field reconstructed from COPY/INCR state — the common case on a quiet line.
fn incremental_add_order() -> Vec<u8> {
    let mut bits = vec![true, false, true];
    bits.extend(std::iter::repeat(false).take(10));
    let mut src = encode_pmap(&bits);
    src.extend(encode_u32(100));
    src
}

fn bench_decode(c: &mut Criterion) {
    let full = full_add_order();
    let incremental = incremental_add_order();
    let mut dst = [0u8; 64];

    c.bench_function("fast_decode_full_add_order", |b| {
        b.iter(|| {
            let mut state = FastFieldState::new();
            let out = fast::decode_message(&mut state, black_box(&full), &mut dst).unwrap();
            black_box(out.bytes_written);
        });
    });

    c.bench_function("fast_decode_incremental_add_order", |b| {
        let mut state = FastFieldState::new();
        fast::decode_message(&mut state, &full, &mut dst).unwrap();
        b.iter(|| {
            let out = fast::decode_message(&mut state, black_box(&incremental), &mut dst).unwrap();
            black_box(out.bytes_written);
        });
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
