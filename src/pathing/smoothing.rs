//! String-pulling pass over a finished route. Grid routes zig-zag because
//! expansion is 8-connected; when a later node can be reached from an
//! earlier one by an unobstructed straight line the intermediates carry no
//! information and are spliced out.
//!
//! The optimisation is greedy and local, not globally optimal, and wholly
//! skippable - a request that wants raw grid nodes simply turns it off.
//! Portal nodes and their immediate predecessors are never spliced out
//! since the hop they describe is mandatory.
//!

use crate::prelude::*;

/// Whether a straight line between two cells of one grid crosses only
/// cells the agent could occupy
fn line_of_sight(
	matrix: &CellMatrix,
	from: CellIndex,
	to: CellIndex,
	capabilities: AttributeMask,
	clearance: f32,
) -> bool {
	for cell in from.get_cells_between_points(&to) {
		if !matrix
			.get_cell_at(cell)
			.is_occupiable(capabilities, clearance, false)
		{
			return false;
		}
	}
	true
}

/// Splice out nodes a straight line renders redundant, recomputing the
/// accumulated costs of the survivors from their actual step distances.
/// Passes repeat internally until nothing more can be removed, so running
/// the whole smoothing again yields the identical route
pub fn smooth_path(
	nodes: &mut Vec<PathNode>,
	world: &NavWorld,
	capabilities: AttributeMask,
	clearance: f32,
) {
	if nodes.len() < 3 {
		return;
	}
	while splice_pass(nodes, world, capabilities, clearance) {}
	// accumulated costs over the straightened legs
	let mut g = nodes[0].get_g();
	for index in 1..nodes.len() {
		let step = if nodes[index].is_portal() {
			PORTAL_MOVE_COST
		} else {
			ray_length_cost(nodes[index - 1].get_cell(), nodes[index].get_cell())
		};
		g += step;
		nodes[index].set_g(g);
	}
}

/// One greedy pass: from each anchor take the farthest consecutive node
/// still in line of sight. Returns whether any node was removed
fn splice_pass(
	nodes: &mut Vec<PathNode>,
	world: &NavWorld,
	capabilities: AttributeMask,
	clearance: f32,
) -> bool {
	let mut kept: Vec<PathNode> = Vec::with_capacity(nodes.len());
	let mut anchor = 0;
	kept.push(nodes[0]);
	while anchor < nodes.len() - 1 {
		let anchor_node = &nodes[anchor];
		let mut best = anchor + 1;
		// portals partition the route, a line may never bridge one
		if !nodes[best].is_portal() && anchor_node.get_grid() == nodes[best].get_grid() {
			if let Some(grid) = world.get_grid(anchor_node.get_grid()) {
				let matrix = grid.get_matrix();
				let mut probe = anchor + 2;
				while probe < nodes.len()
					&& !nodes[probe].is_portal()
					&& nodes[probe].get_grid() == anchor_node.get_grid()
					&& line_of_sight(
						matrix,
						anchor_node.get_cell(),
						nodes[probe].get_cell(),
						capabilities,
						clearance,
					) {
					best = probe;
					probe += 1;
				}
			}
		}
		kept.push(nodes[best]);
		anchor = best;
	}
	let removed = kept.len() < nodes.len();
	*nodes = kept;
	removed
}

/// Integer cost of the straight line between two cells
fn ray_length_cost(from: CellIndex, to: CellIndex) -> i32 {
	let dc = from.get_column().abs_diff(to.get_column()) as f32;
	let dr = from.get_row().abs_diff(to.get_row()) as f32;
	(COST_SCALE as f32 * (dc * dc + dr * dr).sqrt()) as i32
}

#[cfg(test)]
mod tests {
	use super::*;
	use bevy::prelude::*;
	use std::time::Duration;

	fn node(world: &NavWorld, column: usize, row: usize, g: i32) -> PathNode {
		let grid = world.get_grid(GridId::new(0)).unwrap();
		let position = grid
			.get_matrix()
			.get_cell_at(CellIndex::new(column, row))
			.get_position();
		PathNode::new(GridId::new(0), CellIndex::new(column, row), position, g, false)
	}
	fn open_world() -> NavWorld {
		let mut world = NavWorld::default();
		world.insert_grid(
			GridId::new(0),
			NavGrid::new(CellMatrix::new(Vec3::ZERO, 1.0, 10, 10)),
		);
		world
	}
	#[test]
	fn straight_run_collapses_to_endpoints() {
		let world = open_world();
		let mut nodes = vec![
			node(&world, 0, 0, 0),
			node(&world, 1, 0, 10),
			node(&world, 2, 0, 20),
			node(&world, 3, 0, 30),
			node(&world, 4, 0, 40),
		];
		smooth_path(&mut nodes, &world, AttributeMask::GROUND, 0.0);
		assert_eq!(2, nodes.len());
		assert_eq!(CellIndex::new(0, 0), nodes[0].get_cell());
		assert_eq!(CellIndex::new(4, 0), nodes[1].get_cell());
		assert_eq!(40, nodes[1].get_g());
	}
	#[test]
	fn obstacle_keeps_turning_point() {
		let mut world = open_world();
		{
			let matrix = world
				.get_grid_mut(GridId::new(0))
				.unwrap()
				.get_matrix_mut();
			matrix.set_cell_passable(CellIndex::new(2, 1), AttributeMask::NONE, Duration::ZERO);
		}
		// an L around the blocked cell
		let mut nodes = vec![
			node(&world, 0, 1, 0),
			node(&world, 1, 1, 10),
			node(&world, 1, 0, 20),
			node(&world, 2, 0, 30),
			node(&world, 3, 0, 40),
			node(&world, 4, 1, 54),
		];
		smooth_path(&mut nodes, &world, AttributeMask::GROUND, 0.0);
		// the corner survives, both endpoints survive
		assert!(nodes.len() >= 3);
		assert_eq!(CellIndex::new(0, 1), nodes[0].get_cell());
		assert_eq!(CellIndex::new(4, 1), nodes.last().unwrap().get_cell());
		// the splice never routes through the blocked cell
		for pair in nodes.windows(2) {
			assert!(line_of_sight(
				world.get_grid(GridId::new(0)).unwrap().get_matrix(),
				pair[0].get_cell(),
				pair[1].get_cell(),
				AttributeMask::GROUND,
				0.0
			));
		}
	}
	#[test]
	fn smoothing_is_idempotent() {
		let world = open_world();
		let mut nodes = vec![
			node(&world, 0, 0, 0),
			node(&world, 1, 1, 14),
			node(&world, 2, 1, 24),
			node(&world, 3, 2, 38),
			node(&world, 4, 2, 48),
		];
		smooth_path(&mut nodes, &world, AttributeMask::GROUND, 0.0);
		let once = nodes.clone();
		smooth_path(&mut nodes, &world, AttributeMask::GROUND, 0.0);
		assert_eq!(once, nodes);
	}
	#[test]
	fn two_node_route_untouched() {
		let world = open_world();
		let mut nodes = vec![node(&world, 0, 0, 0), node(&world, 1, 0, 10)];
		smooth_path(&mut nodes, &world, AttributeMask::GROUND, 0.0);
		assert_eq!(2, nodes.len());
	}
	#[test]
	fn costs_stay_non_decreasing_after_smoothing() {
		let world = open_world();
		let mut nodes = vec![
			node(&world, 0, 0, 0),
			node(&world, 1, 1, 14),
			node(&world, 2, 2, 28),
			node(&world, 3, 2, 38),
			node(&world, 4, 2, 48),
			node(&world, 5, 3, 62),
		];
		smooth_path(&mut nodes, &world, AttributeMask::GROUND, 0.0);
		for pair in nodes.windows(2) {
			assert!(pair[0].get_g() <= pair[1].get_g());
		}
	}
}
