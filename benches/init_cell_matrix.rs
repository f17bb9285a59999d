//! Measure initialising a large CellMatrix
//!

use bevy::prelude::Vec3;
use bevy_nav_grid_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Create a matrix of the given footprint
fn init_cell_matrix(columns: usize, rows: usize) {
	let _matrix = CellMatrix::new(Vec3::ZERO, 1.0, columns, rows);
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("data_initialisation");
	group.significance_level(0.05).sample_size(100);
	group.bench_function("init_cell_matrix", |b| {
		b.iter(|| init_cell_matrix(black_box(1000), black_box(1000)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
