//! The [Path] container handed to whichever consumer won the request. Nodes
//! are stored forward-ordered and consumed from the front through a cursor
//! rather than by shifting the vector, so steady-state consumption never
//! reallocates and a consumer can peek ahead of the active node to smooth
//! its motion into upcoming corners.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A single node of a computed route
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathNode {
	/// Grid the node belongs to
	grid: GridId,
	/// Cell of the grid
	cell: CellIndex,
	/// World position of the cell centre
	position: Vec3,
	/// Accumulated traversal cost from the start of the route
	g: i32,
	/// Whether arriving at this node crosses a portal, i.e. the node is the
	/// destination side of a portal edge
	portal: bool,
}

impl PathNode {
	/// Create a new instance of [PathNode]
	pub fn new(grid: GridId, cell: CellIndex, position: Vec3, g: i32, portal: bool) -> Self {
		PathNode {
			grid,
			cell,
			position,
			g,
			portal,
		}
	}
	/// Get the owning grid
	pub fn get_grid(&self) -> GridId {
		self.grid
	}
	/// Get the cell
	pub fn get_cell(&self) -> CellIndex {
		self.cell
	}
	/// Get the world position
	pub fn get_position(&self) -> Vec3 {
		self.position
	}
	/// Get the accumulated cost
	pub fn get_g(&self) -> i32 {
		self.g
	}
	/// Set the accumulated cost
	pub fn set_g(&mut self, g: i32) {
		self.g = g;
	}
	/// Whether this node is reached by crossing a portal
	pub fn is_portal(&self) -> bool {
		self.portal
	}
}

/// An ordered node sequence consumed front to back by exactly one consumer
#[derive(Clone, Debug, Default)]
pub struct Path {
	/// The nodes in travel order
	nodes: Vec<PathNode>,
	/// Index of the next node to be consumed
	cursor: usize,
	/// Accumulated cost of the final node
	total_cost: i32,
	/// World-space length of the whole route
	total_length: f32,
}

impl Path {
	/// Create a new instance of [Path], caching its total cost and length
	pub fn new(nodes: Vec<PathNode>) -> Self {
		let total_cost = nodes.last().map_or(0, |node| node.get_g());
		let mut total_length = 0.0;
		for pair in nodes.windows(2) {
			total_length += pair[0].get_position().distance(pair[1].get_position());
		}
		Path {
			nodes,
			cursor: 0,
			total_cost,
			total_length,
		}
	}
	/// Get every node including already consumed ones
	pub fn get_nodes(&self) -> &Vec<PathNode> {
		&self.nodes
	}
	/// Accumulated cost of the final node
	pub fn get_total_cost(&self) -> i32 {
		self.total_cost
	}
	/// World-space length of the whole route
	pub fn get_total_length(&self) -> f32 {
		self.total_length
	}
	/// Number of nodes not yet consumed
	pub fn remaining(&self) -> usize {
		self.nodes.len() - self.cursor
	}
	/// Whether every node has been consumed
	pub fn is_exhausted(&self) -> bool {
		self.cursor >= self.nodes.len()
	}
	/// The node currently being travelled towards
	pub fn front(&self) -> Option<&PathNode> {
		self.nodes.get(self.cursor)
	}
	/// Look `ahead` nodes past the front without consuming, `peek(0)` being
	/// the front itself
	pub fn peek(&self, ahead: usize) -> Option<&PathNode> {
		self.nodes.get(self.cursor + ahead)
	}
	/// Consume the front node, advancing the cursor
	pub fn pop_front(&mut self) -> Option<PathNode> {
		let node = self.nodes.get(self.cursor).copied();
		if node.is_some() {
			self.cursor += 1;
		}
		node
	}
	/// The final node of the route
	pub fn last(&self) -> Option<&PathNode> {
		self.nodes.last()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	fn three_node_path() -> Path {
		let nodes = vec![
			PathNode::new(GridId::new(0), CellIndex::new(0, 0), Vec3::ZERO, 0, false),
			PathNode::new(
				GridId::new(0),
				CellIndex::new(1, 0),
				Vec3::new(1.0, 0.0, 0.0),
				10,
				false,
			),
			PathNode::new(
				GridId::new(0),
				CellIndex::new(2, 0),
				Vec3::new(2.0, 0.0, 0.0),
				20,
				false,
			),
		];
		Path::new(nodes)
	}
	#[test]
	fn total_cost_equals_final_g() {
		let path = three_node_path();
		let result = path.get_total_cost();
		let actual = 20;
		assert_eq!(actual, result);
	}
	#[test]
	fn total_length_sums_segments() {
		let path = three_node_path();
		let result = path.get_total_length();
		let actual = 2.0;
		assert_eq!(actual, result);
	}
	#[test]
	fn consumption_advances_without_mutation_of_nodes() {
		let mut path = three_node_path();
		assert_eq!(3, path.remaining());
		let first = path.pop_front().unwrap();
		assert_eq!(CellIndex::new(0, 0), first.get_cell());
		assert_eq!(2, path.remaining());
		// the full node record is retained for inspection
		assert_eq!(3, path.get_nodes().len());
	}
	#[test]
	fn peek_looks_ahead_of_front() {
		let mut path = three_node_path();
		path.pop_front();
		let result = path.peek(1).unwrap().get_cell();
		let actual = CellIndex::new(2, 0);
		assert_eq!(actual, result);
	}
	#[test]
	fn exhaustion() {
		let mut path = three_node_path();
		while path.pop_front().is_some() {}
		assert!(path.is_exhausted());
		assert_eq!(None, path.peek(0));
	}
	#[test]
	fn costs_non_decreasing() {
		let path = three_node_path();
		for pair in path.get_nodes().windows(2) {
			assert!(pair[0].get_g() <= pair[1].get_g());
		}
	}
}
