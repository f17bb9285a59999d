//! Jump Point Search successor generation. On uniform-cost ground most
//! grid neighbours are symmetric - a route through them exists exactly when
//! a route around them does - so instead of pushing every neighbour the
//! expansion races along rays and only pushes the points where a choice
//! genuinely has to be made: a forced neighbour appears beside the ray, or
//! the goal is hit.
//!
//! Only the successor generation differs from A*; the open/closed protocol,
//! portal hops, decay checks and reconstruction are shared in the engine.
//! Diagonal rays allowed to cut corners match the neighbour rule used by
//! the plain A* expansion, keeping the two algorithms route-compatible.
//!

use crate::prelude::*;

/// Whether a cell is in-bounds and traversable for the searching agent
fn walkable(
	matrix: &CellMatrix,
	column: i32,
	row: i32,
	capabilities: AttributeMask,
	clearance: f32,
) -> bool {
	if column < 0 || row < 0 {
		return false;
	}
	let (column, row) = (column as usize, row as usize);
	if column >= matrix.get_columns() || row >= matrix.get_rows() {
		return false;
	}
	matrix
		.get_cell_at(CellIndex::new(column, row))
		.is_occupiable(capabilities, clearance, false)
}

/// Octile step cost between two cells lying on a shared ray
fn ray_cost(from: CellIndex, to: CellIndex) -> i32 {
	let dc = from.get_column().abs_diff(to.get_column()) as i32;
	let dr = from.get_row().abs_diff(to.get_row()) as i32;
	let diagonal_steps = dc.min(dr);
	let cardinal_steps = (dc - dr).abs();
	diagonal_steps * DIAGONAL_MOVE_COST + cardinal_steps * CARDINAL_MOVE_COST
}

/// The directions worth leaving `cell` in, pruned by how the search arrived
/// there. The start node fans out in every direction
fn pruned_directions(
	matrix: &CellMatrix,
	cell: CellIndex,
	arrival: Option<GridDirection>,
	capabilities: AttributeMask,
	clearance: f32,
) -> Vec<GridDirection> {
	let Some(arrival) = arrival else {
		return GridDirection::ALL.to_vec();
	};
	let (column, row) = (cell.get_column() as i32, cell.get_row() as i32);
	let (dc, dr) = arrival.offset();
	let mut directions = Vec::new();
	if arrival.is_diagonal() {
		// natural: both components and the diagonal itself
		directions.push(delta_direction((dc, 0)));
		directions.push(delta_direction((0, dr)));
		directions.push(arrival);
		// forced: an obstacle beside the arrival ray opens a direction the
		// pruning would otherwise discard
		if !walkable(matrix, column - dc, row, capabilities, clearance) {
			directions.push(delta_direction((-dc, dr)));
		}
		if !walkable(matrix, column, row - dr, capabilities, clearance) {
			directions.push(delta_direction((dc, -dr)));
		}
	} else {
		directions.push(arrival);
		if dc != 0 {
			// travelling horizontally, blocked cells above or below force
			// the adjacent diagonals
			if !walkable(matrix, column, row - 1, capabilities, clearance) {
				directions.push(delta_direction((dc, -1)));
			}
			if !walkable(matrix, column, row + 1, capabilities, clearance) {
				directions.push(delta_direction((dc, 1)));
			}
		} else {
			if !walkable(matrix, column - 1, row, capabilities, clearance) {
				directions.push(delta_direction((-1, dr)));
			}
			if !walkable(matrix, column + 1, row, capabilities, clearance) {
				directions.push(delta_direction((1, dr)));
			}
		}
	}
	directions
}

/// The [GridDirection] matching a step delta
fn delta_direction(delta: (i32, i32)) -> GridDirection {
	match delta {
		(0, -1) => GridDirection::North,
		(1, -1) => GridDirection::NorthEast,
		(1, 0) => GridDirection::East,
		(1, 1) => GridDirection::SouthEast,
		(0, 1) => GridDirection::South,
		(-1, 1) => GridDirection::SouthWest,
		(-1, 0) => GridDirection::West,
		(-1, -1) => GridDirection::NorthWest,
		_ => panic!("Delta {:?} is not a unit grid step", delta),
	}
}

/// Whether a cell has a forced neighbour relative to a direction of travel,
/// meaning the ray must stop and surrender the decision to the open set
fn has_forced_neighbour(
	matrix: &CellMatrix,
	cell: CellIndex,
	direction: GridDirection,
	capabilities: AttributeMask,
	clearance: f32,
) -> bool {
	let (column, row) = (cell.get_column() as i32, cell.get_row() as i32);
	let (dc, dr) = direction.offset();
	if direction.is_diagonal() {
		(!walkable(matrix, column - dc, row, capabilities, clearance)
			&& walkable(matrix, column - dc, row + dr, capabilities, clearance))
			|| (!walkable(matrix, column, row - dr, capabilities, clearance)
				&& walkable(matrix, column + dc, row - dr, capabilities, clearance))
	} else if dc != 0 {
		(!walkable(matrix, column, row - 1, capabilities, clearance)
			&& walkable(matrix, column + dc, row - 1, capabilities, clearance))
			|| (!walkable(matrix, column, row + 1, capabilities, clearance)
				&& walkable(matrix, column + dc, row + 1, capabilities, clearance))
	} else {
		(!walkable(matrix, column - 1, row, capabilities, clearance)
			&& walkable(matrix, column - 1, row + dr, capabilities, clearance))
			|| (!walkable(matrix, column + 1, row, capabilities, clearance)
				&& walkable(matrix, column + 1, row + dr, capabilities, clearance))
	}
}

/// Race along a ray from `cell` until a jump point, the goal or an obstacle
fn jump(
	matrix: &CellMatrix,
	cell: CellIndex,
	direction: GridDirection,
	goal: CellIndex,
	capabilities: AttributeMask,
	clearance: f32,
) -> Option<CellIndex> {
	let (dc, dr) = direction.offset();
	let mut column = cell.get_column() as i32;
	let mut row = cell.get_row() as i32;
	loop {
		column += dc;
		row += dr;
		if !walkable(matrix, column, row, capabilities, clearance) {
			return None;
		}
		let here = CellIndex::new(column as usize, row as usize);
		if here == goal {
			return Some(here);
		}
		if has_forced_neighbour(matrix, here, direction, capabilities, clearance) {
			return Some(here);
		}
		if direction.is_diagonal() {
			// a jump point on either component ray makes this cell one too
			let horizontal = delta_direction((dc, 0));
			let vertical = delta_direction((0, dr));
			if jump(matrix, here, horizontal, goal, capabilities, clearance).is_some()
				|| jump(matrix, here, vertical, goal, capabilities, clearance).is_some()
			{
				return Some(here);
			}
		}
	}
}

/// Successor generation for a popped node: prune directions by the arrival
/// ray, race each survivor and relax only the jump points found
pub(crate) fn expand_jump_points(
	search: &mut PathSearch,
	world: &NavWorld,
	current: usize,
	grid_id: GridId,
	cell: CellIndex,
) {
	let options = *search.node_request_options();
	let Some(grid) = world.get_grid(grid_id) else {
		return;
	};
	let matrix = grid.get_matrix();
	let arrival = search.node(current).get_predecessor().and_then(|pred| {
		let pred_node = search.node(pred);
		// a portal hop has no meaningful ray, treat the node as a fresh start
		if pred_node.get_grid() != grid_id {
			None
		} else {
			Some(GridDirection::cell_to_cell_direction(cell, pred_node.get_cell()))
		}
	});
	let goal = if search.get_goal().0 == grid_id {
		search.get_goal().1
	} else {
		// the true goal lies beyond a portal, race rays against an
		// unreachable sentinel so only forced neighbours stop them
		CellIndex::new(usize::MAX, usize::MAX)
	};
	let current_g = search.node(current).get_g();
	for direction in pruned_directions(
		matrix,
		cell,
		arrival,
		options.capabilities,
		options.clearance,
	) {
		if let Some(jump_point) = jump(
			matrix,
			cell,
			direction,
			goal,
			options.capabilities,
			options.clearance,
		) {
			let tentative_g = current_g + ray_cost(cell, jump_point);
			search.relax((grid_id, jump_point), tentative_g, current, false);
		}
	}
}
