// SPDX-License-Identifier: Apache-2.0

use criterion::{black_box, Criterion, criterion_group, criterion_main};
use pretty_assertions::assert_eq;
use chainio::{Chain, DefaultPool, PoolOptions, BLOCK_SIZE};
use chainio::search::{find_lanes, find_scalar, ByteSet};

const LENGTH: usize = 64 * 1024;

/// Header-like text with a single terminator at the very end.
fn data() -> Vec<u8> {
	let mut data: Vec<u8> = b"X-Padding: abcdefghijklmnopqrstuvwxyz0123456789 "
		.iter()
		.copied()
		.cycle()
		.take(LENGTH - 2)
		.collect();
	data.extend_from_slice(b"\r\n");
	data
}

fn search_block(c: &mut Criterion) {
	let data = data();
	let block = &data[..BLOCK_SIZE];
	let set = ByteSet::two(b'\r', b'\n');

	let mut group = c.benchmark_group("search_block");
	group.bench_function("lanes", |b| b.iter(||
		assert_eq!(find_lanes(black_box(block), &set), None)
	));
	group.bench_function("scalar", |b| b.iter(||
		assert_eq!(find_scalar(black_box(block), &set), None)
	));
	group.finish();
}

fn seek_chain(c: &mut Criterion) {
	let data = data();
	let chain = Chain::new(DefaultPool::new(PoolOptions::new())).unwrap();
	chain.tail().copy_from(&data).unwrap();
	let start = chain.cursor();

	let mut group = c.benchmark_group("seek_chain");
	group.bench_function("one byte", |b| b.iter(|| {
		let mut cursor = start;
		assert_eq!(cursor.seek(b'\r'), Some(b'\r'));
	}));
	group.bench_function("three bytes", |b| b.iter(|| {
		let mut cursor = start;
		assert_eq!(cursor.seek((b'\r', b'\n', 0)), Some(b'\r'));
	}));
	group.bench_function("count limit", |b| b.iter(|| {
		let mut cursor = start;
		assert_eq!(cursor.seek_within((b'\r', b'\n'), LENGTH / 2), (None, LENGTH / 2));
	}));
	group.finish();
}

criterion_group!(benches, search_block, seek_chain);
criterion_main!(benches);
