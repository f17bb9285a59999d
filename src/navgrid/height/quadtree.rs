//! Quad-tree backed height storage. The tree starts as a single uniform
//! leaf and subdivides lazily, only where a recorded sample diverges from
//! the height already stored for the surrounding region. Worlds made of
//! large flats with occasional ridges stay tiny in memory.
//!
//! Terrain edits that span several frames use the two-phase protocol:
//! [QuadTreeHeightLookup::prepare_region_update] clones the smallest
//! aligned subtree covering the requested bounds, the caller mutates that
//! copy in isolation and [QuadTreeHeightLookup::commit_region_update]
//! splices it back. A reader interleaved between the two phases always sees
//! the old subtree whole, never a partial edit.
//!

use crate::prelude::RegionBounds;

/// A node of the height tree, either a uniform-height region or four
/// sub-quadrants
#[derive(Clone, Debug, PartialEq)]
enum QuadNode {
	/// Uniform height across the node's whole square
	Leaf(f32),
	/// Children ordered north-west, north-east, south-west, south-east
	Branch(Box<[QuadNode; 4]>),
}

/// Quadrant index of a coordinate within a node square
fn quadrant(node_x: i32, node_z: i32, node_size: i32, x: i32, z: i32) -> usize {
	let half = node_size / 2;
	let east = x >= node_x + half;
	let south = z >= node_z + half;
	match (east, south) {
		(false, false) => 0,
		(true, false) => 1,
		(false, true) => 2,
		(true, true) => 3,
	}
}

/// Origin of a child quadrant square
fn child_origin(node_x: i32, node_z: i32, node_size: i32, index: usize) -> (i32, i32) {
	let half = node_size / 2;
	match index {
		0 => (node_x, node_z),
		1 => (node_x + half, node_z),
		2 => (node_x, node_z + half),
		_ => (node_x + half, node_z + half),
	}
}

/// Record a sample in a subtree, subdividing only where the sample diverges
/// from the stored uniform height
fn add_sample(node: &mut QuadNode, node_x: i32, node_z: i32, node_size: i32, x: i32, z: i32, height: f32) {
	match node {
		QuadNode::Leaf(existing) => {
			if *existing == height {
				return;
			}
			if node_size == 1 {
				*node = QuadNode::Leaf(height);
				return;
			}
			// divergent sample, split the uniform region and recurse
			let split = *existing;
			*node = QuadNode::Branch(Box::new([
				QuadNode::Leaf(split),
				QuadNode::Leaf(split),
				QuadNode::Leaf(split),
				QuadNode::Leaf(split),
			]));
			add_sample(node, node_x, node_z, node_size, x, z, height);
		}
		QuadNode::Branch(children) => {
			let index = quadrant(node_x, node_z, node_size, x, z);
			let (cx, cz) = child_origin(node_x, node_z, node_size, index);
			add_sample(&mut children[index], cx, cz, node_size / 2, x, z, height);
		}
	}
}

/// Read the height of a coordinate from a subtree
fn sample_height(node: &QuadNode, node_x: i32, node_z: i32, node_size: i32, x: i32, z: i32) -> f32 {
	match node {
		QuadNode::Leaf(height) => *height,
		QuadNode::Branch(children) => {
			let index = quadrant(node_x, node_z, node_size, x, z);
			let (cx, cz) = child_origin(node_x, node_z, node_size, index);
			sample_height(&children[index], cx, cz, node_size / 2, x, z)
		}
	}
}

/// Height storage over a `columns` by `rows` area with O(log n) queries
#[derive(Clone)]
pub struct QuadTreeHeightLookup {
	/// Number of coordinates along `x`
	columns: i32,
	/// Number of coordinates along `z`
	rows: i32,
	/// Edge length of the root square, the next power of two covering the
	/// real extent
	size: i32,
	/// Root of the tree
	root: QuadNode,
}

impl QuadTreeHeightLookup {
	/// Create a new instance of [QuadTreeHeightLookup] with a uniform
	/// starting height
	pub fn new(columns: i32, rows: i32, uniform: f32) -> Self {
		if columns <= 0 || rows <= 0 {
			panic!(
				"Height lookup dimensions `({}, {})` are invalid",
				columns, rows
			);
		}
		let extent = columns.max(rows) as u32;
		let size = extent.next_power_of_two() as i32;
		QuadTreeHeightLookup {
			columns,
			rows,
			size,
			root: QuadNode::Leaf(uniform),
		}
	}
	/// Whether a coordinate is inside the covered area
	fn in_bounds(&self, x: i32, z: i32) -> bool {
		x >= 0 && x < self.columns && z >= 0 && z < self.rows
	}
	/// Record a height sample. Out-of-bounds samples are ignored
	pub fn add(&mut self, x: i32, z: i32, height: f32) {
		if self.in_bounds(x, z) {
			add_sample(&mut self.root, 0, 0, self.size, x, z, height);
		}
	}
	/// Get the height at a coordinate, resolving to the uniform height of
	/// the covering region when nothing was sampled at that exact spot
	pub fn try_get_height(&self, x: i32, z: i32) -> Option<f32> {
		if !self.in_bounds(x, z) {
			return None;
		}
		Some(sample_height(&self.root, 0, 0, self.size, x, z))
	}
	/// Clone the smallest aligned subtree fully covering `bounds` so it can
	/// be mutated in isolation. Bounds straddling a split are covered by
	/// cloning the straddled parent whole
	pub fn prepare_region_update(&self, bounds: RegionBounds) -> QuadTreeRegion {
		let mut node = &self.root;
		let mut node_x = 0;
		let mut node_z = 0;
		let mut node_size = self.size;
		// descend while one quadrant fully contains the requested bounds
		loop {
			if node_size <= 1 {
				break;
			}
			let index = quadrant(node_x, node_z, node_size, bounds.min.0, bounds.min.1);
			let (cx, cz) = child_origin(node_x, node_z, node_size, index);
			let half = node_size / 2;
			let child_contains = bounds.min.0 >= cx
				&& bounds.max.0 <= cx + half
				&& bounds.min.1 >= cz
				&& bounds.max.1 <= cz + half;
			if !child_contains {
				break;
			}
			match node {
				QuadNode::Branch(children) => {
					node = &children[index];
					node_x = cx;
					node_z = cz;
					node_size = half;
				}
				// a leaf already spans the bounds uniformly, stop here
				QuadNode::Leaf(_) => {
					node_x = cx;
					node_z = cz;
					node_size = half;
					break;
				}
			}
		}
		QuadTreeRegion {
			origin: (node_x, node_z),
			size: node_size,
			bounds,
			node: node.clone(),
		}
	}
	/// Splice a prepared region back into the tree. The replacement of the
	/// covering subtree is a single assignment so interleaved readers never
	/// observe a partial update
	pub fn commit_region_update(&mut self, region: QuadTreeRegion) {
		splice(
			&mut self.root,
			0,
			0,
			self.size,
			region.origin,
			region.size,
			region.node,
		);
	}
	/// Count of leaves currently in the tree
	pub fn leaf_count(&self) -> usize {
		fn count(node: &QuadNode) -> usize {
			match node {
				QuadNode::Leaf(_) => 1,
				QuadNode::Branch(children) => children.iter().map(count).sum(),
			}
		}
		count(&self.root)
	}
}

/// Descend to the target square, subdividing uniform leaves along the way,
/// and drop the replacement subtree in
fn splice(
	node: &mut QuadNode,
	node_x: i32,
	node_z: i32,
	node_size: i32,
	target_origin: (i32, i32),
	target_size: i32,
	replacement: QuadNode,
) {
	if node_size == target_size && (node_x, node_z) == target_origin {
		*node = replacement;
		return;
	}
	if let QuadNode::Leaf(height) = node {
		let split = *height;
		*node = QuadNode::Branch(Box::new([
			QuadNode::Leaf(split),
			QuadNode::Leaf(split),
			QuadNode::Leaf(split),
			QuadNode::Leaf(split),
		]));
	}
	if let QuadNode::Branch(children) = node {
		let index = quadrant(node_x, node_z, node_size, target_origin.0, target_origin.1);
		let (cx, cz) = child_origin(node_x, node_z, node_size, index);
		splice(
			&mut children[index],
			cx,
			cz,
			node_size / 2,
			target_origin,
			target_size,
			replacement,
		);
	}
}

/// An isolated copy of a subtree staged for mutation. Samples outside the
/// requested bounds are ignored so a staged edit can never leak past the
/// region it was prepared for
pub struct QuadTreeRegion {
	/// Origin of the covering square in tree coordinates
	origin: (i32, i32),
	/// Edge length of the covering square
	size: i32,
	/// The bounds the caller asked to edit
	bounds: RegionBounds,
	/// The staged subtree
	node: QuadNode,
}

impl QuadTreeRegion {
	/// Get the bounds the region was prepared for
	pub fn get_bounds(&self) -> RegionBounds {
		self.bounds
	}
	/// Record a height sample in the staged subtree. Samples outside the
	/// prepared bounds are ignored
	pub fn add(&mut self, x: i32, z: i32, height: f32) {
		if self.bounds.contains(x, z) {
			add_sample(
				&mut self.node,
				self.origin.0,
				self.origin.1,
				self.size,
				x,
				z,
				height,
			);
		}
	}
	/// Read a height from the staged subtree
	pub fn try_get_height(&self, x: i32, z: i32) -> Option<f32> {
		if !self.bounds.contains(x, z) {
			return None;
		}
		Some(sample_height(
			&self.node,
			self.origin.0,
			self.origin.1,
			self.size,
			x,
			z,
		))
	}
}
