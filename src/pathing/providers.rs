//! Cost and heuristic strategies injected into the search engine. All costs
//! are non-negative integers scaled by a factor of ten - `10` for a
//! cardinal step, `14` for a diagonal (ten times root two, truncated) - so
//! accumulating `g` over thousands of expansions never drifts the way a
//! float sum would.
//!
//! Providers are plain function pointers resolved through a static
//! registry table at startup rather than discovered at runtime.
//!

use crate::prelude::*;

/// Scale applied to unit distances to keep costs integral
pub const COST_SCALE: i32 = 10;
/// Cost of stepping to an orthogonal neighbour
pub const CARDINAL_MOVE_COST: i32 = 10;
/// Cost of stepping to a diagonal neighbour, `10 * sqrt(2)` truncated
pub const DIAGONAL_MOVE_COST: i32 = 14;
/// Cost of crossing a portal edge
pub const PORTAL_MOVE_COST: i32 = 10;

/// The heuristic strategies available to a request
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub enum HeuristicKind {
	/// Octile distance, admissible for 8-connected movement
	#[default]
	Diagonal,
	/// Straight-line distance
	Euclidean,
	/// Chebyshev distance, the number of king-moves
	Cardinal,
	/// Axis-aligned distance, admissible for 4-connected movement
	Manhattan,
}

/// Signature of a heuristic provider: estimated cost between two cells
pub type HeuristicFn = fn(CellIndex, CellIndex) -> i32;

/// Octile distance: diagonal steps where both axes still differ, cardinal
/// steps for the remainder
fn diagonal_heuristic(from: CellIndex, to: CellIndex) -> i32 {
	let dc = from.get_column().abs_diff(to.get_column()) as i32;
	let dr = from.get_row().abs_diff(to.get_row()) as i32;
	let diagonal_steps = dc.min(dr);
	let cardinal_steps = (dc - dr).abs();
	diagonal_steps * DIAGONAL_MOVE_COST + cardinal_steps * CARDINAL_MOVE_COST
}

/// Straight-line distance scaled to integers
fn euclidean_heuristic(from: CellIndex, to: CellIndex) -> i32 {
	let dc = from.get_column().abs_diff(to.get_column()) as f32;
	let dr = from.get_row().abs_diff(to.get_row()) as f32;
	(COST_SCALE as f32 * (dc * dc + dr * dr).sqrt()) as i32
}

/// Chebyshev distance scaled to integers
fn cardinal_heuristic(from: CellIndex, to: CellIndex) -> i32 {
	let dc = from.get_column().abs_diff(to.get_column()) as i32;
	let dr = from.get_row().abs_diff(to.get_row()) as i32;
	dc.max(dr) * CARDINAL_MOVE_COST
}

/// Manhattan distance scaled to integers
fn manhattan_heuristic(from: CellIndex, to: CellIndex) -> i32 {
	let dc = from.get_column().abs_diff(to.get_column()) as i32;
	let dr = from.get_row().abs_diff(to.get_row()) as i32;
	(dc + dr) * CARDINAL_MOVE_COST
}

/// The provider table populated at compile time
const HEURISTIC_REGISTRY: [(HeuristicKind, HeuristicFn); 4] = [
	(HeuristicKind::Diagonal, diagonal_heuristic),
	(HeuristicKind::Euclidean, euclidean_heuristic),
	(HeuristicKind::Cardinal, cardinal_heuristic),
	(HeuristicKind::Manhattan, manhattan_heuristic),
];

impl HeuristicKind {
	/// Resolve the provider implementing this kind
	pub fn provider(&self) -> HeuristicFn {
		for (kind, provider) in HEURISTIC_REGISTRY.iter() {
			if kind == self {
				return *provider;
			}
		}
		// the registry covers every variant
		unreachable!()
	}
}

/// Cost of stepping from a cell to an adjacent cell, the base step cost
/// multiplied by the destination cell's terrain weight
pub fn move_cost(from: CellIndex, to: CellIndex, destination_weight: u8) -> i32 {
	let direction = GridDirection::cell_to_cell_direction(to, from);
	let base = if direction.is_diagonal() {
		DIAGONAL_MOVE_COST
	} else {
		CARDINAL_MOVE_COST
	};
	base * destination_weight as i32
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn diagonal_octile_mix() {
		let from = CellIndex::new(0, 0);
		let to = CellIndex::new(4, 2);
		let result = diagonal_heuristic(from, to);
		// two diagonal steps and two cardinal steps
		let actual = 2 * DIAGONAL_MOVE_COST + 2 * CARDINAL_MOVE_COST;
		assert_eq!(actual, result);
	}
	#[test]
	fn euclidean_three_four_five() {
		let from = CellIndex::new(0, 0);
		let to = CellIndex::new(3, 4);
		let result = euclidean_heuristic(from, to);
		let actual = 50;
		assert_eq!(actual, result);
	}
	#[test]
	fn cardinal_is_chebyshev() {
		let from = CellIndex::new(1, 1);
		let to = CellIndex::new(5, 3);
		let result = cardinal_heuristic(from, to);
		let actual = 40;
		assert_eq!(actual, result);
	}
	#[test]
	fn manhattan_sums_axes() {
		let from = CellIndex::new(1, 1);
		let to = CellIndex::new(5, 3);
		let result = manhattan_heuristic(from, to);
		let actual = 60;
		assert_eq!(actual, result);
	}
	#[test]
	fn registry_resolves_every_kind() {
		let kinds = [
			HeuristicKind::Diagonal,
			HeuristicKind::Euclidean,
			HeuristicKind::Cardinal,
			HeuristicKind::Manhattan,
		];
		let from = CellIndex::new(0, 0);
		let to = CellIndex::new(6, 6);
		for kind in kinds.iter() {
			let estimate = kind.provider()(from, to);
			assert!(estimate > 0);
		}
	}
	#[test]
	fn heuristics_zero_at_goal() {
		let cell = CellIndex::new(4, 4);
		for (_, provider) in HEURISTIC_REGISTRY.iter() {
			assert_eq!(0, provider(cell, cell));
		}
	}
	#[test]
	fn move_cost_weights_terrain() {
		let from = CellIndex::new(2, 2);
		let east = CellIndex::new(3, 2);
		assert_eq!(CARDINAL_MOVE_COST, move_cost(from, east, 1));
		assert_eq!(CARDINAL_MOVE_COST * 5, move_cost(from, east, 5));
		let south_east = CellIndex::new(3, 3);
		assert_eq!(DIAGONAL_MOVE_COST, move_cost(from, south_east, 1));
	}
}
