//! Useful structures and tools used by the cell matrix and the search engine
//!

use crate::prelude::*;

/// Number of cells along each edge of a [crate::prelude::GridSection],
/// sections being the coarse blocks used for change-stamp queries
pub const SECTION_RESOLUTION: usize = 10;

/// Convenience way of accessing the 8 directions of movement across cells
/// of a [crate::prelude::CellMatrix]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum GridDirection {
	North,
	East,
	South,
	West,
	NorthEast,
	SouthEast,
	SouthWest,
	NorthWest,
}

impl GridDirection {
	/// The four orthogonal directions
	pub const CARDINAL: [GridDirection; 4] = [
		GridDirection::North,
		GridDirection::East,
		GridDirection::South,
		GridDirection::West,
	];
	/// All eight directions
	pub const ALL: [GridDirection; 8] = [
		GridDirection::North,
		GridDirection::East,
		GridDirection::South,
		GridDirection::West,
		GridDirection::NorthEast,
		GridDirection::SouthEast,
		GridDirection::SouthWest,
		GridDirection::NorthWest,
	];
	/// The `(column, row)` delta of stepping one cell in this direction.
	/// Row `0` is the northern edge so north is a negative row step
	pub fn offset(&self) -> (i32, i32) {
		match self {
			GridDirection::North => (0, -1),
			GridDirection::East => (1, 0),
			GridDirection::South => (0, 1),
			GridDirection::West => (-1, 0),
			GridDirection::NorthEast => (1, -1),
			GridDirection::SouthEast => (1, 1),
			GridDirection::SouthWest => (-1, 1),
			GridDirection::NorthWest => (-1, -1),
		}
	}
	/// Whether this is a diagonal step
	pub fn is_diagonal(&self) -> bool {
		matches!(
			self,
			GridDirection::NorthEast
				| GridDirection::SouthEast
				| GridDirection::SouthWest
				| GridDirection::NorthWest
		)
	}
	/// Returns the opposite [GridDirection] of the current
	pub fn inverse(&self) -> GridDirection {
		match self {
			GridDirection::North => GridDirection::South,
			GridDirection::East => GridDirection::West,
			GridDirection::South => GridDirection::North,
			GridDirection::West => GridDirection::East,
			GridDirection::NorthEast => GridDirection::SouthWest,
			GridDirection::SouthEast => GridDirection::NorthWest,
			GridDirection::SouthWest => GridDirection::NorthEast,
			GridDirection::NorthWest => GridDirection::SouthEast,
		}
	}
	/// Based on a cells `(column, row)` position find its orthogonal
	/// neighbours within a matrix of `columns` by `rows` (up to 4)
	pub fn get_orthogonal_cell_neighbours(
		cell: CellIndex,
		columns: usize,
		rows: usize,
	) -> Vec<CellIndex> {
		let mut neighbours = Vec::new();
		if cell.get_row() > 0 {
			neighbours.push(CellIndex::new(cell.get_column(), cell.get_row() - 1)); // northern cell coords
		}
		if cell.get_column() < columns - 1 {
			neighbours.push(CellIndex::new(cell.get_column() + 1, cell.get_row())); // eastern cell coords
		}
		if cell.get_row() < rows - 1 {
			neighbours.push(CellIndex::new(cell.get_column(), cell.get_row() + 1)); // southern cell coords
		}
		if cell.get_column() > 0 {
			neighbours.push(CellIndex::new(cell.get_column() - 1, cell.get_row())); // western cell coords
		}
		neighbours
	}
	/// Based on a cells `(column, row)` position find all possible
	/// neighbours including diagonal directions (up to 8)
	pub fn get_all_cell_neighbours(cell: CellIndex, columns: usize, rows: usize) -> Vec<CellIndex> {
		let mut neighbours = Self::get_orthogonal_cell_neighbours(cell, columns, rows);
		let (column, row) = cell.get_column_row();
		if row > 0 && column < columns - 1 {
			neighbours.push(CellIndex::new(column + 1, row - 1)); // north-east cell
		}
		if row < rows - 1 && column < columns - 1 {
			neighbours.push(CellIndex::new(column + 1, row + 1)); // south-east cell
		}
		if row < rows - 1 && column > 0 {
			neighbours.push(CellIndex::new(column - 1, row + 1)); // south-west cell
		}
		if row > 0 && column > 0 {
			neighbours.push(CellIndex::new(column - 1, row - 1)); // north-west cell
		}
		neighbours
	}
	/// For two cells next to each other find the [GridDirection] from the
	/// `source` to the `target`. This will panic if the two cells are not
	/// orthogonally or diagonally adjacent
	pub fn cell_to_cell_direction(target: CellIndex, source: CellIndex) -> Self {
		let i32_target = (target.get_column() as i32, target.get_row() as i32);
		let i32_source = (source.get_column() as i32, source.get_row() as i32);

		let direction = (i32_target.0 - i32_source.0, i32_target.1 - i32_source.1);
		match direction {
			(0, -1) => GridDirection::North,
			(1, -1) => GridDirection::NorthEast,
			(1, 0) => GridDirection::East,
			(1, 1) => GridDirection::SouthEast,
			(0, 1) => GridDirection::South,
			(-1, 1) => GridDirection::SouthWest,
			(-1, 0) => GridDirection::West,
			(-1, -1) => GridDirection::NorthWest,
			_ => panic!(
				"Cell {:?} is not orthogonally or diagonally adjacent to {:?}",
				target, source
			),
		}
	}
}
