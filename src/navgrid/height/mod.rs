//! Terrain height storage backing 3d navigation. Two backings are offered:
//! a flat dictionary for worlds where most coordinates carry a bespoke
//! height, and a quad-tree for worlds of large uniform regions broken by
//! occasional detail.
//!
//! Both guarantee the same contract: once heights have been committed,
//! `try_get_height` answers for every in-bounds coordinate, falling back to
//! the uniform height of the surrounding region when no sample was recorded
//! at that exact spot.
//!
//! The quad-tree additionally supports a two-phase region update so terrain
//! edits spread across several frames never expose a half-written subtree:
//! `prepare_region_update` hands out an isolated copy of the covering
//! subtree, the caller mutates it at leisure, and `commit_region_update`
//! splices it back in a single assignment.
//!

pub mod dictionary;
pub mod quadtree;

use crate::prelude::*;

/// Pluggable height storage for a grid
#[derive(Clone)]
pub enum HeightLookup {
	/// Hash-map backed storage, O(1) lookup
	Dictionary(DictionaryHeightLookup),
	/// Quad-tree backed storage, O(log n) lookup, lazily subdivided
	QuadTree(QuadTreeHeightLookup),
}

impl HeightLookup {
	/// Create a dictionary-backed lookup covering `columns` by `rows` with a
	/// uniform fallback height
	pub fn new_dictionary(columns: i32, rows: i32, fallback: f32) -> Self {
		HeightLookup::Dictionary(DictionaryHeightLookup::new(columns, rows, fallback))
	}
	/// Create a quad-tree backed lookup covering `columns` by `rows` with a
	/// uniform starting height
	pub fn new_quad_tree(columns: i32, rows: i32, uniform: f32) -> Self {
		HeightLookup::QuadTree(QuadTreeHeightLookup::new(columns, rows, uniform))
	}
	/// Record a height sample at a grid coordinate. Out-of-bounds samples
	/// are ignored
	pub fn add(&mut self, x: i32, z: i32, height: f32) {
		match self {
			HeightLookup::Dictionary(lookup) => lookup.add(x, z, height),
			HeightLookup::QuadTree(lookup) => lookup.add(x, z, height),
		}
	}
	/// Get the height at a grid coordinate. Total for in-bounds coordinates,
	/// [None] only when the coordinate is outside the covered area
	pub fn try_get_height(&self, x: i32, z: i32) -> Option<f32> {
		match self {
			HeightLookup::Dictionary(lookup) => lookup.try_get_height(x, z),
			HeightLookup::QuadTree(lookup) => lookup.try_get_height(x, z),
		}
	}
	/// Begin a two-phase update of a bounded region. Only the quad-tree
	/// backing stages updates, the dictionary applies samples directly and
	/// returns [None] here
	pub fn prepare_region_update(&self, bounds: RegionBounds) -> Option<QuadTreeRegion> {
		match self {
			HeightLookup::Dictionary(_) => None,
			HeightLookup::QuadTree(lookup) => Some(lookup.prepare_region_update(bounds)),
		}
	}
	/// Splice a prepared region back into the tree. A no-op for the
	/// dictionary backing
	pub fn commit_region_update(&mut self, region: QuadTreeRegion) {
		if let HeightLookup::QuadTree(lookup) = self {
			lookup.commit_region_update(region);
		}
	}
}

/// An axis-aligned rectangle of grid coordinates, inclusive of `min`,
/// exclusive of `max`
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RegionBounds {
	/// Minimum `(x, z)` corner, inclusive
	pub min: (i32, i32),
	/// Maximum `(x, z)` corner, exclusive
	pub max: (i32, i32),
}

impl RegionBounds {
	/// Create a new instance of [RegionBounds]
	pub fn new(min: (i32, i32), max: (i32, i32)) -> Self {
		if max.0 <= min.0 || max.1 <= min.1 {
			panic!(
				"Region bounds must have positive extent, got min {:?} max {:?}",
				min, max
			);
		}
		RegionBounds { min, max }
	}
	/// Whether a coordinate falls inside the bounds
	pub fn contains(&self, x: i32, z: i32) -> bool {
		x >= self.min.0 && x < self.max.0 && z >= self.min.1 && z < self.max.1
	}
}
