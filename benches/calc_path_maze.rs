//! Measure calculating a route through a 100x100 grid striped with walls,
//! forcing the search to wind back and forth
//!

use std::sync::Arc;
use std::time::Duration;

use bevy::prelude::Vec3;
use bevy_nav_grid_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Walls every fourth row with alternating gaps at either end
fn prepare_maze(columns: usize, rows: usize) -> NavWorld {
	let mut matrix = CellMatrix::new(Vec3::ZERO, 1.0, columns, rows);
	for row in (4..rows).step_by(4) {
		let gap = if (row / 4) % 2 == 0 { columns - 1 } else { 0 };
		for column in 0..columns {
			if column != gap {
				matrix.set_cell_passable(
					CellIndex::new(column, row),
					AttributeMask::NONE,
					Duration::ZERO,
				);
			}
		}
	}
	let mut world = NavWorld::default();
	world.insert_grid(GridId::new(0), NavGrid::new(matrix));
	world
}

/// Corner-to-corner search through the stripes
fn calc(world: &NavWorld, smooth: bool) {
	let request = Arc::new(PathRequest::new(
		Vec3::new(0.5, 0.0, 0.5),
		Vec3::new(99.5, 0.0, 99.5),
		RequesterId::new(0),
		PathRequestOptions {
			smooth,
			..Default::default()
		},
		Duration::ZERO,
	));
	let mut search = PathSearch::new(world, request);
	let _result = search.run_to_completion(world);
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(100);
	let world = prepare_maze(100, 100);
	group.bench_function("calc_path_maze", |b| {
		b.iter(|| calc(black_box(&world), black_box(false)))
	});
	group.bench_function("calc_path_maze_smoothed", |b| {
		b.iter(|| calc(black_box(&world), black_box(true)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
