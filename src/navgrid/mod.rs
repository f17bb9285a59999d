//! A navigable world is divided into one or more grids, each being a matrix
//! of cells overlaying 3d space. A cell knows which classes of agent can
//! stand in it, how much free space surrounds it and optionally how high the
//! terrain sits beneath it.
//!
//! ```text
//!  _____________________________
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|xx|xx|__|__|__|
//! |__|__|__|__|__|xx|xx|__|__|__|
//! |__|__|__|P_|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! ```
//!
//! Definitions:
//!
//! * Cell - atomic unit of the matrix carrying a passability mask, a
//!   clearance radius, a traversal cost weight and optionally an elevation
//! * Section - a coarse `MxN` block of cells carrying a last-modified stamp,
//!   used for cheap "did anything change around here" queries when deciding
//!   whether an agent should replan
//! * Portal - a directed link from a cell of one grid to a cell of another
//!   (or the same) grid, the only way a route may leave a grid
//!

pub mod cell;
pub mod cell_matrix;
pub mod height;
pub mod portal;
pub mod utilities;

use std::collections::BTreeMap;

use crate::prelude::*;
use bevy::prelude::*;

/// Unique ID of a grid within a [NavWorld]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct GridId(u32);

impl GridId {
	/// Create a new instance of [GridId]
	pub fn new(id: u32) -> Self {
		GridId(id)
	}
	/// Get the raw ID
	pub fn get(&self) -> u32 {
		self.0
	}
}

/// A single navigable grid: the cell matrix itself, the height data
/// recorded for it and the portals leading out of it
#[derive(Clone)]
pub struct NavGrid {
	/// Matrix of cells
	matrix: CellMatrix,
	/// Terrain height storage supporting the matrix
	heights: HeightLookup,
	/// Links to other grids
	portals: Portals,
}

impl NavGrid {
	/// Create a new instance of [NavGrid] from a prepared [CellMatrix],
	/// with an empty portal set and a dictionary height backing that falls
	/// back to the grid origin height
	pub fn new(matrix: CellMatrix) -> Self {
		let fallback = matrix.get_origin().y;
		let (columns, rows) = (matrix.get_columns(), matrix.get_rows());
		NavGrid {
			matrix,
			heights: HeightLookup::new_dictionary(columns as i32, rows as i32, fallback),
			portals: Portals::default(),
		}
	}
	/// Create a new instance of [NavGrid] with an explicit height backing
	pub fn with_heights(matrix: CellMatrix, heights: HeightLookup) -> Self {
		NavGrid {
			matrix,
			heights,
			portals: Portals::default(),
		}
	}
	/// Get a reference to the cell matrix
	pub fn get_matrix(&self) -> &CellMatrix {
		&self.matrix
	}
	/// Get a mutable reference to the cell matrix
	pub fn get_matrix_mut(&mut self) -> &mut CellMatrix {
		&mut self.matrix
	}
	/// Get a reference to the height storage
	pub fn get_heights(&self) -> &HeightLookup {
		&self.heights
	}
	/// Get a mutable reference to the height storage
	pub fn get_heights_mut(&mut self) -> &mut HeightLookup {
		&mut self.heights
	}
	/// Get a reference to the portals anchored in this grid
	pub fn get_portals(&self) -> &Portals {
		&self.portals
	}
	/// Get a mutable reference to the portals anchored in this grid
	pub fn get_portals_mut(&mut self) -> &mut Portals {
		&mut self.portals
	}
}

/// The set of grids making up the navigable world. Searches walk cells of a
/// single grid and may only hop to another grid through a portal edge
#[derive(Component, Default, Clone)]
pub struct NavWorld {
	/// All grids keyed by their ID
	grids: BTreeMap<GridId, NavGrid>,
}

impl NavWorld {
	/// Insert a grid, replacing any previous grid registered under `id`
	pub fn insert_grid(&mut self, id: GridId, grid: NavGrid) {
		self.grids.insert(id, grid);
	}
	/// Get the map of grids
	pub fn get(&self) -> &BTreeMap<GridId, NavGrid> {
		&self.grids
	}
	/// Get a grid by its ID. Returns [None] if it doesn't exist
	pub fn get_grid(&self, id: GridId) -> Option<&NavGrid> {
		self.grids.get(&id)
	}
	/// Get a mutable grid by its ID. Returns [None] if it doesn't exist
	pub fn get_grid_mut(&mut self, id: GridId) -> Option<&mut NavGrid> {
		self.grids.get_mut(&id)
	}
	/// Find the grid containing a world position and the cell index the
	/// position falls in. Grids are probed in ascending [GridId] order so
	/// overlapping grids resolve deterministically. Returns [None] when the
	/// position is outside every grid
	pub fn find_cell_at(&self, position: Vec3) -> Option<(GridId, CellIndex)> {
		for (id, grid) in self.grids.iter() {
			if let Some(index) = grid.get_matrix().get_cell_index_from_position(position) {
				return Some((*id, index));
			}
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn world_resolves_position_to_owning_grid() {
		let mut world = NavWorld::default();
		let matrix_a = CellMatrix::new(Vec3::new(0.0, 0.0, 0.0), 1.0, 10, 10);
		let matrix_b = CellMatrix::new(Vec3::new(50.0, 0.0, 0.0), 1.0, 10, 10);
		world.insert_grid(GridId::new(0), NavGrid::new(matrix_a));
		world.insert_grid(GridId::new(1), NavGrid::new(matrix_b));

		let result = world.find_cell_at(Vec3::new(52.5, 0.0, 3.5));
		let actual = Some((GridId::new(1), CellIndex::new(2, 3)));
		assert_eq!(actual, result);
	}
	#[test]
	fn world_position_outside_all_grids() {
		let mut world = NavWorld::default();
		let matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		world.insert_grid(GridId::new(0), NavGrid::new(matrix));
		let result = world.find_cell_at(Vec3::new(-3.0, 0.0, 4.0));
		assert_eq!(None, result);
	}
}
