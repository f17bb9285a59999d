//! Measure calculating a route across an open 100x100 grid
//!

use std::sync::Arc;
use std::time::Duration;

use bevy::prelude::Vec3;
use bevy_nav_grid_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Create a uniformly walkable world before benchmarking
fn prepare_world(columns: usize, rows: usize) -> NavWorld {
	let mut world = NavWorld::default();
	let matrix = CellMatrix::new(Vec3::ZERO, 1.0, columns, rows);
	world.insert_grid(GridId::new(0), NavGrid::new(matrix));
	world
}

/// Corner-to-corner search with the default A* options
fn calc(world: &NavWorld, algorithm: SearchAlgorithm) {
	let request = Arc::new(PathRequest::new(
		Vec3::new(0.5, 0.0, 0.5),
		Vec3::new(99.5, 0.0, 99.5),
		RequesterId::new(0),
		PathRequestOptions {
			algorithm,
			smooth: false,
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
	let world = prepare_world(100, 100);
	group.bench_function("calc_path_open_astar", |b| {
		b.iter(|| calc(black_box(&world), black_box(SearchAlgorithm::AStar)))
	});
	group.bench_function("calc_path_open_jps", |b| {
		b.iter(|| calc(black_box(&world), black_box(SearchAlgorithm::JumpPoint)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
