//! The [CellMatrix] is a 2d array of [Cell] laid over 3d space. Columns run
//! along world `x` and rows along world `z`, with the matrix origin at the
//! minimum `(x, z)` corner. The `y` component of the origin is the base
//! height of the grid.
//!
//! On top of the cells the matrix maintains a coarser array of
//! [GridSection], each covering [SECTION_RESOLUTION] cells along both axes.
//! Whenever a cell is mutated the owning section records the time of the
//! change, which lets an agent ask "has anything changed near me since I
//! planned my route" without walking cells.
//!

use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// A coarse sub-region of the matrix carrying the stamp of its most recent
/// cell mutation
#[derive(Clone, Copy, Debug, Default)]
pub struct GridSection {
	/// Time of the last mutation of any cell in the section, measured as
	/// elapsed time since app start
	last_changed: Duration,
}

impl GridSection {
	/// Get the stamp of the most recent mutation
	pub fn get_last_changed(&self) -> Duration {
		self.last_changed
	}
}

/// A 2d matrix of [Cell] over 3d space
#[derive(Clone)]
pub struct CellMatrix {
	/// World position of the minimum `(x, z)` corner, `y` being the base
	/// height of the grid
	origin: Vec3,
	/// Length of a cell edge in world units
	cell_size: f32,
	/// Number of cells along world `x`
	columns: usize,
	/// Number of cells along world `z`
	rows: usize,
	/// Cells in column-major order, index `column * rows + row`
	cells: Vec<Cell>,
	/// Change-stamp sections, column-major
	sections: Vec<GridSection>,
	/// Number of sections along world `x`
	section_columns: usize,
	/// Number of sections along world `z`
	section_rows: usize,
}

impl CellMatrix {
	/// Create a new instance of [CellMatrix] with every cell defaulting to
	/// ground-passable at cost `1` and clearance of half a cell
	pub fn new(origin: Vec3, cell_size: f32, columns: usize, rows: usize) -> Self {
		if columns == 0 || rows == 0 {
			panic!(
				"Matrix dimensions `({}, {})` are invalid, a matrix must contain at least one cell",
				columns, rows
			);
		}
		if cell_size <= 0.0 {
			panic!("Cell size must be positive, got {}", cell_size);
		}
		let mut cells = Vec::with_capacity(columns * rows);
		for column in 0..columns {
			for row in 0..rows {
				let index = CellIndex::new(column, row);
				let position = Vec3::new(
					origin.x + column as f32 * cell_size + cell_size / 2.0,
					origin.y,
					origin.z + row as f32 * cell_size + cell_size / 2.0,
				);
				cells.push(Cell::new(index, position, cell_size / 2.0));
			}
		}
		let section_columns = columns.div_ceil(SECTION_RESOLUTION);
		let section_rows = rows.div_ceil(SECTION_RESOLUTION);
		let sections = vec![GridSection::default(); section_columns * section_rows];
		CellMatrix {
			origin,
			cell_size,
			columns,
			rows,
			cells,
			sections,
			section_columns,
			section_rows,
		}
	}
	/// Get the world position of the minimum corner
	pub fn get_origin(&self) -> Vec3 {
		self.origin
	}
	/// Get the cell edge length
	pub fn get_cell_size(&self) -> f32 {
		self.cell_size
	}
	/// Get the number of columns
	pub fn get_columns(&self) -> usize {
		self.columns
	}
	/// Get the number of rows
	pub fn get_rows(&self) -> usize {
		self.rows
	}
	/// Flat index of a cell, panics when the index is outside the matrix
	fn flat_index(&self, index: CellIndex) -> usize {
		if index.get_column() >= self.columns || index.get_row() >= self.rows {
			panic!(
				"Cell index out of bounds. Asked for column {}, row {}, matrix is {} columns by {} rows",
				index.get_column(),
				index.get_row(),
				self.columns,
				self.rows
			);
		}
		index.get_column() * self.rows + index.get_row()
	}
	/// Get a cell by its matrix coordinates, panics when outside the matrix
	pub fn get_cell_at(&self, index: CellIndex) -> &Cell {
		&self.cells[self.flat_index(index)]
	}
	/// From a world position find the [CellIndex] of the cell it falls in.
	/// Returns [None] when the position sits outside the matrix footprint
	pub fn get_cell_index_from_position(&self, position: Vec3) -> Option<CellIndex> {
		let local_x = position.x - self.origin.x;
		let local_z = position.z - self.origin.z;
		if local_x < 0.0 || local_z < 0.0 {
			return None;
		}
		let mut column = (local_x / self.cell_size).floor() as usize;
		let mut row = (local_z / self.cell_size).floor() as usize;
		if local_x > self.columns as f32 * self.cell_size
			|| local_z > self.rows as f32 * self.cell_size
		{
			return None;
		}
		// safety for positions at the exact far edge of the footprint
		if column >= self.columns {
			column = self.columns - 1;
		}
		if row >= self.rows {
			row = self.rows - 1;
		}
		Some(CellIndex::new(column, row))
	}
	/// From a world position get the [Cell] containing it. With
	/// `allow_out_of_bounds` an outside position is clamped to the nearest
	/// edge cell instead of returning [None]
	pub fn get_cell(&self, position: Vec3, allow_out_of_bounds: bool) -> Option<&Cell> {
		match self.get_cell_index_from_position(position) {
			Some(index) => Some(self.get_cell_at(index)),
			None => {
				if allow_out_of_bounds {
					let local_x = (position.x - self.origin.x)
						.clamp(0.0, (self.columns as f32 - 0.5) * self.cell_size);
					let local_z = (position.z - self.origin.z)
						.clamp(0.0, (self.rows as f32 - 0.5) * self.cell_size);
					let column = (local_x / self.cell_size).floor() as usize;
					let row = (local_z / self.cell_size).floor() as usize;
					Some(self.get_cell_at(CellIndex::new(column, row)))
				} else {
					None
				}
			}
		}
	}
	/// Search outward from `target` in expanding rings for a cell an agent
	/// could occupy, bounded by `max_cell_radius` rings. The first ring
	/// containing any candidate wins and the candidate closest to `from` by
	/// squared world distance is returned, ties broken by ring scan order
	/// (north edge west to east, then east, south and west edges). Returns
	/// [None] when no ring within the bound has a candidate
	pub fn get_nearest_walkable_cell(
		&self,
		target: Vec3,
		from: Vec3,
		allow_partial: bool,
		max_cell_radius: usize,
		capabilities: AttributeMask,
		required_clearance: f32,
	) -> Option<CellIndex> {
		let centre = self.get_cell_index_from_position(target)?;
		for radius in 0..=max_cell_radius {
			let mut best: Option<(CellIndex, f32)> = None;
			for candidate in self.ring_cells(centre, radius) {
				let cell = self.get_cell_at(candidate);
				if cell.is_occupiable(capabilities, required_clearance, allow_partial) {
					let distance = cell.get_position().distance_squared(from);
					match best {
						Some((_, best_distance)) if distance >= best_distance => {}
						_ => best = Some((candidate, distance)),
					}
				}
			}
			if let Some((index, _)) = best {
				return Some(index);
			}
		}
		None
	}
	/// The in-bounds cells lying on the square ring at Chebyshev distance
	/// `radius` from `centre`, in deterministic scan order
	fn ring_cells(&self, centre: CellIndex, radius: usize) -> Vec<CellIndex> {
		if radius == 0 {
			return vec![centre];
		}
		let r = radius as i32;
		let cc = centre.get_column() as i32;
		let cr = centre.get_row() as i32;
		let mut cells = Vec::new();
		let push = |column: i32, row: i32, cells: &mut Vec<CellIndex>| {
			if column >= 0 && row >= 0 && (column as usize) < self.columns && (row as usize) < self.rows
			{
				cells.push(CellIndex::new(column as usize, row as usize));
			}
		};
		// north edge, west to east
		for column in (cc - r)..=(cc + r) {
			push(column, cr - r, &mut cells);
		}
		// east edge, excluding corners
		for row in (cr - r + 1)..=(cr + r - 1) {
			push(cc + r, row, &mut cells);
		}
		// south edge, west to east
		for column in (cc - r)..=(cc + r) {
			push(column, cr + r, &mut cells);
		}
		// west edge, excluding corners
		for row in (cr - r + 1)..=(cr + r - 1) {
			push(cc - r, row, &mut cells);
		}
		cells
	}
	/// Section coordinates owning a cell
	fn section_of(&self, index: CellIndex) -> usize {
		let section_column = index.get_column() / SECTION_RESOLUTION;
		let section_row = index.get_row() / SECTION_RESOLUTION;
		section_column * self.section_rows + section_row
	}
	/// Whether the section containing `position` has had any cell mutated
	/// after `since`. Positions outside the matrix report `false`
	pub fn has_sections_changed_since(&self, position: Vec3, since: Duration) -> bool {
		match self.get_cell_index_from_position(position) {
			Some(index) => self.sections[self.section_of(index)].last_changed > since,
			None => false,
		}
	}
	/// Get the change-stamp sections
	pub fn get_sections(&self) -> &Vec<GridSection> {
		&self.sections
	}
	/// Replace the passability mask of a cell, stamping the owning section
	pub fn set_cell_passable(&mut self, index: CellIndex, passable: AttributeMask, now: Duration) {
		let flat = self.flat_index(index);
		self.cells[flat].set_passable(passable);
		let section = self.section_of(index);
		self.sections[section].last_changed = now;
	}
	/// Replace the cost weight of a cell, stamping the owning section
	pub fn set_cell_cost(&mut self, index: CellIndex, cost: u8, now: Duration) {
		let flat = self.flat_index(index);
		self.cells[flat].set_cost(cost);
		let section = self.section_of(index);
		self.sections[section].last_changed = now;
	}
	/// Replace the clearance radius of a cell, stamping the owning section
	pub fn set_cell_clearance(&mut self, index: CellIndex, clearance: f32, now: Duration) {
		let flat = self.flat_index(index);
		self.cells[flat].set_clearance(clearance);
		let section = self.section_of(index);
		self.sections[section].last_changed = now;
	}
	/// Record an elevation against a cell, stamping the owning section
	pub fn set_cell_elevation(&mut self, index: CellIndex, elevation: f32, now: Duration) {
		let flat = self.flat_index(index);
		self.cells[flat].set_elevation(elevation);
		let section = self.section_of(index);
		self.sections[section].last_changed = now;
	}
	/// From a `ron` file of cost weights generate a [CellMatrix]. Cells with
	/// weight [IMPASSABLE_COST] additionally get an empty passability mask
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening CellMatrix file");
		let descriptor: MatrixDescriptor = match ron::de::from_reader(file) {
			Ok(descriptor) => descriptor,
			Err(e) => panic!("Failed deserializing CellMatrix: {}", e),
		};
		descriptor.into_matrix()
	}
	/// From a `csv` file of cost weights, `rows` records of `columns`
	/// comma-separated values, generate a [CellMatrix]
	#[cfg(feature = "csv")]
	pub fn from_csv(origin: Vec3, cell_size: f32, path: String) -> Self {
		let mut reader = csv::ReaderBuilder::new()
			.has_headers(false)
			.from_path(path)
			.expect("Failed opening CellMatrix csv");
		let mut weights: Vec<Vec<u8>> = Vec::new();
		for record in reader.records() {
			let record = record.expect("Failed reading csv record");
			let row: Vec<u8> = record
				.iter()
				.map(|value| {
					value
						.trim()
						.parse::<u8>()
						.expect("CellMatrix csv values must be u8 cost weights")
				})
				.collect();
			weights.push(row);
		}
		if weights.is_empty() {
			panic!("CellMatrix csv contained no records");
		}
		let rows = weights.len();
		let columns = weights[0].len();
		let mut matrix = CellMatrix::new(origin, cell_size, columns, rows);
		for (row, record) in weights.iter().enumerate() {
			if record.len() != columns {
				panic!(
					"CellMatrix csv is ragged, record {} has {} values, expected {}",
					row,
					record.len(),
					columns
				);
			}
			for (column, weight) in record.iter().enumerate() {
				let index = CellIndex::new(column, row);
				matrix.set_cell_cost(index, *weight, Duration::ZERO);
				if *weight == IMPASSABLE_COST {
					matrix.set_cell_passable(index, AttributeMask::NONE, Duration::ZERO);
				}
			}
		}
		matrix
	}
}

/// On-disk shape of a [CellMatrix]: footprint plus a column-major array of
/// cost weights
#[cfg(feature = "serde")]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct MatrixDescriptor {
	/// Minimum corner as an `(x, y, z)` tuple
	origin: (f32, f32, f32),
	/// Cell edge length
	cell_size: f32,
	/// Cost weights, outer index column, inner index row
	cost_weights: Vec<Vec<u8>>,
}

#[cfg(feature = "serde")]
impl MatrixDescriptor {
	/// Build the runtime matrix the descriptor describes
	pub fn into_matrix(self) -> CellMatrix {
		if self.cost_weights.is_empty() || self.cost_weights[0].is_empty() {
			panic!("MatrixDescriptor cost weights are empty");
		}
		let columns = self.cost_weights.len();
		let rows = self.cost_weights[0].len();
		let origin = Vec3::new(self.origin.0, self.origin.1, self.origin.2);
		let mut matrix = CellMatrix::new(origin, self.cell_size, columns, rows);
		for (column, weights) in self.cost_weights.iter().enumerate() {
			for (row, weight) in weights.iter().enumerate() {
				let index = CellIndex::new(column, row);
				matrix.set_cell_cost(index, *weight, Duration::ZERO);
				if *weight == IMPASSABLE_COST {
					matrix.set_cell_passable(index, AttributeMask::NONE, Duration::ZERO);
				}
			}
		}
		matrix
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn cell_contains_queried_position() {
		let matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		let position = Vec3::new(4.3, 0.0, 7.9);
		let cell = matrix.get_cell(position, false).unwrap();
		let half = matrix.get_cell_size() / 2.0;
		let centre = cell.get_position();
		assert!((position.x - centre.x).abs() <= half);
		assert!((position.z - centre.z).abs() <= half);
	}
	#[test]
	fn position_outside_matrix() {
		let matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		let result = matrix.get_cell(Vec3::new(-0.5, 0.0, 3.0), false);
		assert!(result.is_none());
	}
	#[test]
	fn out_of_bounds_clamps_to_edge() {
		let matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		let cell = matrix.get_cell(Vec3::new(-5.0, 0.0, 3.5), true).unwrap();
		let actual = CellIndex::new(0, 3);
		assert_eq!(actual, cell.get_index());
	}
	#[test]
	fn far_edge_position_resolves() {
		let matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		let result = matrix.get_cell_index_from_position(Vec3::new(10.0, 0.0, 10.0));
		let actual = Some(CellIndex::new(9, 9));
		assert_eq!(actual, result);
	}
	#[test]
	#[should_panic]
	fn zero_dimension_matrix() {
		CellMatrix::new(Vec3::ZERO, 1.0, 0, 10);
	}
	#[test]
	fn nearest_walkable_prefers_cell_closest_to_from() {
		let mut matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		// block the target cell itself
		matrix.set_cell_passable(CellIndex::new(5, 5), AttributeMask::NONE, Duration::ZERO);
		let target = Vec3::new(5.5, 0.0, 5.5);
		let from = Vec3::new(0.5, 0.0, 5.5);
		let result = matrix.get_nearest_walkable_cell(
			target,
			from,
			false,
			3,
			AttributeMask::GROUND,
			0.0,
		);
		// ring 1 candidate nearest the western `from` position
		let actual = Some(CellIndex::new(4, 5));
		assert_eq!(actual, result);
	}
	#[test]
	fn nearest_walkable_none_within_radius() {
		let mut matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		for column in 3..=7 {
			for row in 3..=7 {
				matrix.set_cell_passable(
					CellIndex::new(column, row),
					AttributeMask::NONE,
					Duration::ZERO,
				);
			}
		}
		let target = Vec3::new(5.5, 0.0, 5.5);
		let result = matrix.get_nearest_walkable_cell(
			target,
			target,
			false,
			1,
			AttributeMask::GROUND,
			0.0,
		);
		assert_eq!(None, result);
	}
	#[test]
	fn nearest_walkable_radius_zero_on_open_ground() {
		let matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		let target = Vec3::new(2.5, 0.0, 2.5);
		let result = matrix.get_nearest_walkable_cell(
			target,
			target,
			false,
			0,
			AttributeMask::GROUND,
			0.0,
		);
		let actual = Some(CellIndex::new(2, 2));
		assert_eq!(actual, result);
	}
	#[test]
	fn section_stamp_flags_change() {
		let mut matrix = CellMatrix::new(Vec3::ZERO, 1.0, 20, 20);
		let plan_time = Duration::from_secs(5);
		let position = Vec3::new(3.0, 0.0, 3.0);
		assert!(!matrix.has_sections_changed_since(position, plan_time));
		matrix.set_cell_cost(CellIndex::new(2, 2), 50, Duration::from_secs(9));
		assert!(matrix.has_sections_changed_since(position, plan_time));
		// a mutation in a different section leaves this one untouched
		let far_position = Vec3::new(15.0, 0.0, 15.0);
		assert!(!matrix.has_sections_changed_since(far_position, plan_time));
	}
	#[test]
	fn mutation_before_plan_does_not_flag() {
		let mut matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		matrix.set_cell_cost(CellIndex::new(1, 1), 9, Duration::from_secs(2));
		assert!(!matrix.has_sections_changed_since(Vec3::new(1.5, 0.0, 1.5), Duration::from_secs(4)));
	}
}
