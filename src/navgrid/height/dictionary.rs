//! Hash-map backed height storage. Every sampled coordinate costs a map
//! entry so this backing suits worlds where terrain varies nearly
//! everywhere and the quad-tree would subdivide down to leaves anyway.
//!

use std::collections::HashMap;

/// Height storage over a `columns` by `rows` area with O(1) queries
#[derive(Clone)]
pub struct DictionaryHeightLookup {
	/// Number of coordinates along `x`
	columns: i32,
	/// Number of coordinates along `z`
	rows: i32,
	/// Uniform height reported for coordinates without a sample
	fallback: f32,
	/// Recorded samples keyed by `(x, z)`
	heights: HashMap<(i32, i32), f32>,
}

impl DictionaryHeightLookup {
	/// Create a new instance of [DictionaryHeightLookup]
	pub fn new(columns: i32, rows: i32, fallback: f32) -> Self {
		if columns <= 0 || rows <= 0 {
			panic!(
				"Height lookup dimensions `({}, {})` are invalid",
				columns, rows
			);
		}
		DictionaryHeightLookup {
			columns,
			rows,
			fallback,
			heights: HashMap::new(),
		}
	}
	/// Whether a coordinate is inside the covered area
	fn in_bounds(&self, x: i32, z: i32) -> bool {
		x >= 0 && x < self.columns && z >= 0 && z < self.rows
	}
	/// Record a height sample. Out-of-bounds samples are ignored
	pub fn add(&mut self, x: i32, z: i32, height: f32) {
		if self.in_bounds(x, z) {
			self.heights.insert((x, z), height);
		}
	}
	/// Drop the sample at a coordinate, reverting it to the fallback
	pub fn remove(&mut self, x: i32, z: i32) {
		self.heights.remove(&(x, z));
	}
	/// Get the height at a coordinate, falling back to the uniform region
	/// height when nothing was sampled there
	pub fn try_get_height(&self, x: i32, z: i32) -> Option<f32> {
		if !self.in_bounds(x, z) {
			return None;
		}
		Some(*self.heights.get(&(x, z)).unwrap_or(&self.fallback))
	}
	/// Number of explicit samples held
	pub fn sample_count(&self) -> usize {
		self.heights.len()
	}
}
