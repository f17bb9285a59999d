//! A [Cell] is the atomic unit of a [crate::prelude::CellMatrix]. Its
//! identity - matrix coordinates and centre position - never changes once
//! the matrix is built, while its passability, clearance and cost weight
//! may be mutated as obstacles come and go.
//!
//! Passability is expressed as a mask of movement classes so that a single
//! matrix can serve mixed populations of agents - infantry that walk,
//! amphibians that also cross water, climbers that scale steep cells. A
//! cell is walkable for a requester when the masks share at least one
//! class.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// The cost weight marking a cell as never traversable regardless of the
/// passability mask
pub const IMPASSABLE_COST: u8 = 255;

/// ID of a cell within a [crate::prelude::CellMatrix]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct CellIndex((usize, usize));

impl CellIndex {
	/// Create a new instance of [CellIndex]
	pub fn new(column: usize, row: usize) -> Self {
		CellIndex((column, row))
	}
	/// Get the `(column, row)` tuple
	pub fn get_column_row(&self) -> (usize, usize) {
		self.0
	}
	/// Get the column
	pub fn get_column(&self) -> usize {
		self.0 .0
	}
	/// Get the row
	pub fn get_row(&self) -> usize {
		self.0 .1
	}
	/// Chebyshev distance to another index, i.e. the number of king-moves
	/// between the two cells
	pub fn ring_distance(&self, other: &CellIndex) -> usize {
		let dc = self.get_column().abs_diff(other.get_column());
		let dr = self.get_row().abs_diff(other.get_row());
		dc.max(dr)
	}
	/// Using the Bresenham line algorithm get a list of [CellIndex] that lie
	/// along a line between two points, ordered from `self` towards `target`
	pub fn get_cells_between_points(&self, target: &CellIndex) -> Vec<CellIndex> {
		let source_col = self.get_column() as i32;
		let source_row = self.get_row() as i32;
		let target_col = target.get_column() as i32;
		let target_row = target.get_row() as i32;

		// optimise for orthognal line (horizontal or vertical)
		if source_col == target_col {
			let mut cells = Vec::new();
			if source_row < target_row {
				for row in source_row..=target_row {
					cells.push(CellIndex::new(source_col as usize, row as usize));
				}
				cells
			} else {
				for row in target_row..=source_row {
					cells.push(CellIndex::new(source_col as usize, row as usize));
				}
				cells.reverse();
				cells
			}
		} else if source_row == target_row {
			let mut cells = Vec::new();
			if source_col < target_col {
				for col in source_col..=target_col {
					cells.push(CellIndex::new(col as usize, source_row as usize));
				}
				cells
			} else {
				for col in target_col..=source_col {
					cells.push(CellIndex::new(col as usize, source_row as usize));
				}
				cells.reverse();
				cells
			}
		} else if (target_row - source_row).abs() < (target_col - source_col).abs() {
			if source_col > target_col {
				let mut cells = walk_bresenham_shallow(target_col, target_row, source_col, source_row);
				// ensure list points in the direction of source to target
				cells.reverse();
				cells
			} else {
				walk_bresenham_shallow(source_col, source_row, target_col, target_row)
			}
		} else if source_row > target_row {
			let mut cells = walk_bresenham_steep(target_col, target_row, source_col, source_row);
			cells.reverse();
			cells
		} else {
			walk_bresenham_steep(source_col, source_row, target_col, target_row)
		}
	}
}
/// When finding a shallow raster representation of a line we step through the x-dimension and increment y based on an error bound which indicates which cells lie on the line
fn walk_bresenham_shallow(col_0: i32, row_0: i32, col_1: i32, row_1: i32) -> Vec<CellIndex> {
	let mut cells = Vec::new();

	let delta_col = col_1 - col_0;
	let mut delta_row = row_1 - row_0;

	let mut row_increment = 1;
	if delta_row < 0 {
		row_increment = -1;
		delta_row *= -1;
	}
	let mut difference = 2 * delta_row - delta_col;
	let mut row = row_0;

	for col in col_0..=col_1 {
		cells.push(CellIndex::new(col as usize, row as usize));
		if difference > 0 {
			row += row_increment;
			difference += 2 * (delta_row - delta_col);
		} else {
			difference += 2 * delta_row;
		}
	}
	cells
}
/// When finding a steep raster representation of a line we step through the y-dimension and increment x based on an error bound which indicates which cells lie on the line
fn walk_bresenham_steep(col_0: i32, row_0: i32, col_1: i32, row_1: i32) -> Vec<CellIndex> {
	let mut cells = Vec::new();

	let mut delta_col = col_1 - col_0;
	let delta_row = row_1 - row_0;

	let mut col_increment = 1;
	if delta_col < 0 {
		col_increment = -1;
		delta_col *= -1;
	}
	let mut difference = 2 * delta_col - delta_row;
	let mut col = col_0;

	for row in row_0..=row_1 {
		cells.push(CellIndex::new(col as usize, row as usize));
		if difference > 0 {
			col += col_increment;
			difference += 2 * (delta_col - delta_row);
		} else {
			difference += 2 * delta_col;
		}
	}
	cells
}

/// Bitmask of movement classes used for cell passability and agent
/// capability
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Reflect)]
pub struct AttributeMask(u32);

impl AttributeMask {
	/// No movement class, nothing can occupy the cell
	pub const NONE: AttributeMask = AttributeMask(0);
	/// Standard ground movement
	pub const GROUND: AttributeMask = AttributeMask(1);
	/// Shallow water and fords
	pub const AMPHIBIOUS: AttributeMask = AttributeMask(1 << 1);
	/// Steep terrain a climber can scale
	pub const CLIMBER: AttributeMask = AttributeMask(1 << 2);
	/// Hovering movement unaffected by ground texture
	pub const HOVER: AttributeMask = AttributeMask(1 << 3);
	/// Every movement class
	pub const ALL: AttributeMask = AttributeMask(u32::MAX);
	/// Create a mask from raw bits
	pub fn from_bits(bits: u32) -> Self {
		AttributeMask(bits)
	}
	/// Get the raw bits
	pub fn bits(&self) -> u32 {
		self.0
	}
	/// Combine two masks
	pub fn union(&self, other: AttributeMask) -> AttributeMask {
		AttributeMask(self.0 | other.0)
	}
	/// Whether the two masks share any movement class
	pub fn intersects(&self, other: AttributeMask) -> bool {
		self.0 & other.0 != 0
	}
	/// Whether every class of `other` is present in this mask
	pub fn contains(&self, other: AttributeMask) -> bool {
		self.0 & other.0 == other.0
	}
}

impl Default for AttributeMask {
	fn default() -> Self {
		AttributeMask::GROUND
	}
}

/// Atomic unit of a [crate::prelude::CellMatrix]
#[derive(Clone, Copy, Debug)]
pub struct Cell {
	/// Matrix coordinates, fixed at build time
	index: CellIndex,
	/// World position of the cell centre, fixed at build time
	position: Vec3,
	/// Which movement classes may traverse the cell
	passable: AttributeMask,
	/// Radius of free space around the cell centre in world units
	clearance: f32,
	/// Sampled terrain height, [None] until height data is recorded
	elevation: Option<f32>,
	/// Traversal cost weight, `1` being easiest and [IMPASSABLE_COST]
	/// marking a wall or cliff
	cost: u8,
}

impl Cell {
	/// Create a new instance of [Cell] at a position with default passability
	pub fn new(index: CellIndex, position: Vec3, clearance: f32) -> Self {
		Cell {
			index,
			position,
			passable: AttributeMask::default(),
			clearance,
			elevation: None,
			cost: 1,
		}
	}
	/// Get the matrix coordinates
	pub fn get_index(&self) -> CellIndex {
		self.index
	}
	/// Get the world position of the cell centre
	pub fn get_position(&self) -> Vec3 {
		self.position
	}
	/// Get the passability mask
	pub fn get_passable(&self) -> AttributeMask {
		self.passable
	}
	/// Set the passability mask
	pub fn set_passable(&mut self, passable: AttributeMask) {
		self.passable = passable;
	}
	/// Get the clearance radius
	pub fn get_clearance(&self) -> f32 {
		self.clearance
	}
	/// Set the clearance radius
	pub fn set_clearance(&mut self, clearance: f32) {
		self.clearance = clearance;
	}
	/// Get the recorded elevation
	pub fn get_elevation(&self) -> Option<f32> {
		self.elevation
	}
	/// Record an elevation for the cell
	pub fn set_elevation(&mut self, elevation: f32) {
		self.elevation = Some(elevation);
	}
	/// Get the traversal cost weight
	pub fn get_cost(&self) -> u8 {
		self.cost
	}
	/// Set the traversal cost weight
	pub fn set_cost(&mut self, cost: u8) {
		self.cost = cost;
	}
	/// Whether an agent with the given capabilities may stand in this cell,
	/// ignoring clearance
	pub fn is_walkable(&self, capabilities: AttributeMask) -> bool {
		self.cost != IMPASSABLE_COST && self.passable.intersects(capabilities)
	}
	/// Whether an agent with the given capabilities and size may occupy this
	/// cell. With `allow_partial` the clearance requirement is waived and a
	/// squeezing agent is accepted
	pub fn is_occupiable(
		&self,
		capabilities: AttributeMask,
		required_clearance: f32,
		allow_partial: bool,
	) -> bool {
		self.is_walkable(capabilities) && (allow_partial || self.clearance >= required_clearance)
	}
}
