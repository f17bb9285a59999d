//! The search engine proper. A search is an explicit resumable object
//! holding its arena of nodes, its open set and its lifecycle status -
//! callers drive it with [PathSearch::step_once] at whatever cadence suits
//! them and read the open/closed sets between steps if they want to watch
//! it work.
//!
//! A* and Jump Point Search share the same skeleton: validate the
//! endpoints, seed the open set, pop-close-expand until the goal is closed
//! or the set drains. JPS differs only in which successors an expansion
//! produces. Portal cells contribute one extra successor on the far side of
//! their edge, which is the only way a search leaves its grid.
//!

use std::collections::HashMap;
use std::sync::Arc;

use crate::prelude::*;
use bevy::prelude::*;

/// Which expansion strategy a search runs
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SearchAlgorithm {
	/// Plain A* honouring per-cell terrain weights
	#[default]
	AStar,
	/// Jump Point Search, prunes symmetric neighbours on uniform-cost
	/// ground. Terrain weights are ignored, cells are merely passable or
	/// not
	JumpPoint,
}

/// Observable lifecycle of a [PathSearch]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SearchStatus {
	/// Nodes remain to be expanded
	Expanding,
	/// The search has reached a terminal classification
	Settled(PathResultStatus),
}

/// A node in the search arena. Predecessors are arena indices rather than
/// references so the whole search state is a flat, cheaply movable value
#[derive(Clone, Copy, Debug)]
pub struct SearchNode {
	/// Grid the node belongs to
	grid: GridId,
	/// Cell of the grid
	cell: CellIndex,
	/// Accumulated cost from the start
	g: i32,
	/// Estimated remaining cost to the goal
	h: i32,
	/// Whether the node has been expanded
	closed: bool,
	/// Arena index of the node this one was reached from
	predecessor: Option<usize>,
	/// Whether the node was reached by crossing a portal edge
	portal: bool,
}

impl SearchNode {
	/// Get the owning grid
	pub fn get_grid(&self) -> GridId {
		self.grid
	}
	/// Get the cell
	pub fn get_cell(&self) -> CellIndex {
		self.cell
	}
	/// Get the accumulated cost
	pub fn get_g(&self) -> i32 {
		self.g
	}
	/// Get the total score `g + h`
	pub fn get_f(&self) -> i32 {
		self.g + self.h
	}
	/// Whether the node has been expanded
	pub fn is_closed(&self) -> bool {
		self.closed
	}
	/// Arena index of the node this one was reached from
	pub fn get_predecessor(&self) -> Option<usize> {
		self.predecessor
	}
}

/// Adjusts a request's endpoints before cell resolution, e.g. snapping a
/// click just off the map back onto it. Processors run in order ahead of
/// the search itself
pub trait RequestPreProcessor: Send + Sync {
	/// Adjust the effective endpoints
	fn process(&self, from: &mut Vec3, to: &mut Vec3, world: &NavWorld);
}

/// Clamps both endpoints into the footprint of the first grid that contains
/// either of them, or the first grid of the world when neither lands
pub struct ClampToGrid;

impl RequestPreProcessor for ClampToGrid {
	fn process(&self, from: &mut Vec3, to: &mut Vec3, world: &NavWorld) {
		let grid = world
			.find_cell_at(*from)
			.or_else(|| world.find_cell_at(*to))
			.map(|(id, _)| id)
			.or_else(|| world.get().keys().next().copied());
		if let Some(id) = grid {
			if let Some(nav_grid) = world.get_grid(id) {
				let matrix = nav_grid.get_matrix();
				if let Some(cell) = matrix.get_cell(*from, true) {
					*from = cell.get_position();
				}
				if let Some(cell) = matrix.get_cell(*to, true) {
					*to = cell.get_position();
				}
			}
		}
	}
}

/// A resumable search over the grids of a [NavWorld]
pub struct PathSearch {
	/// The request being served
	request: Arc<PathRequest>,
	/// Resolved start
	start: (GridId, CellIndex),
	/// Resolved, possibly substituted, goal
	goal: (GridId, CellIndex),
	/// Set when the requested destination was blocked and a nearby cell was
	/// substituted, downgrading a found route to [PathResultStatus::DestinationBlocked]
	substituted_goal: bool,
	/// Heuristic provider resolved from the request options
	heuristic: HeuristicFn,
	/// Node arena
	nodes: Vec<SearchNode>,
	/// Arena index by grid and cell
	lookup: HashMap<(GridId, CellIndex), usize>,
	/// Discovered-but-unexpanded nodes
	open: OpenSet,
	/// Lifecycle
	status: SearchStatus,
	/// Arena index of the expanded node with the lowest heuristic, the
	/// fallback endpoint for partial routes
	best_towards_goal: Option<usize>,
	/// The reconstructed route once settled
	path: Option<Path>,
	/// Diagnostic text accompanying a failure
	error: Option<String>,
}

impl PathSearch {
	/// Create a new instance of [PathSearch], validating the request
	/// endpoints. An invalid request settles immediately and
	/// [PathSearch::step_once] becomes a no-op
	pub fn new(world: &NavWorld, request: Arc<PathRequest>) -> Self {
		Self::with_pre_processors(world, request, &[])
	}
	/// As [PathSearch::new] with a processor chain applied to the request
	/// endpoints first
	pub fn with_pre_processors(
		world: &NavWorld,
		request: Arc<PathRequest>,
		pre_processors: &[&dyn RequestPreProcessor],
	) -> Self {
		let mut from = request.get_from();
		let mut to = request.get_to();
		for processor in pre_processors.iter() {
			processor.process(&mut from, &mut to, world);
		}
		let options = *request.get_options();
		let heuristic = options.heuristic.provider();
		let mut search = PathSearch {
			request,
			start: (GridId::default(), CellIndex::default()),
			goal: (GridId::default(), CellIndex::default()),
			substituted_goal: false,
			heuristic,
			nodes: Vec::new(),
			lookup: HashMap::new(),
			open: OpenSet::default(),
			status: SearchStatus::Expanding,
			best_towards_goal: None,
			path: None,
			error: None,
		};
		let start = match world.find_cell_at(from) {
			Some(start) => start,
			None => {
				search.status = SearchStatus::Settled(PathResultStatus::StartOutsideGrid);
				return search;
			}
		};
		let goal = match world.find_cell_at(to) {
			Some(goal) => goal,
			None => {
				search.status = SearchStatus::Settled(PathResultStatus::EndOutsideGrid);
				return search;
			}
		};
		search.start = start;
		search.goal = goal;
		// a blocked destination is substituted with the nearest cell the
		// requester could actually occupy, or reported without a route
		let goal_matrix = world
			.get_grid(goal.0)
			.expect("Grid resolved from position must exist")
			.get_matrix();
		let goal_cell = goal_matrix.get_cell_at(goal.1);
		if !goal_cell.is_occupiable(options.capabilities, options.clearance, false) {
			let substitute = if options.navigate_to_nearest_if_blocked && options.nearest_radius > 0
			{
				goal_matrix.get_nearest_walkable_cell(
					to,
					from,
					false,
					options.nearest_radius,
					options.capabilities,
					options.clearance,
				)
			} else {
				None
			};
			match substitute {
				Some(cell) => {
					debug!("Destination {:?} blocked, substituting {:?}", goal.1, cell);
					search.goal = (goal.0, cell);
					search.substituted_goal = true;
				}
				None => {
					search.status = SearchStatus::Settled(PathResultStatus::DestinationBlocked);
					return search;
				}
			}
		}
		// seed the open set. The start cell is accepted even when blocked so
		// an agent stranded by a terrain edit can path its way out
		let h = search.estimate(start.0, start.1);
		search.nodes.push(SearchNode {
			grid: start.0,
			cell: start.1,
			g: 0,
			h,
			closed: false,
			predecessor: None,
			portal: false,
		});
		search.lookup.insert(start, 0);
		search.open.push(h, 0);
		search
	}
	/// Estimated remaining cost from a cell to the goal. Cross-grid
	/// estimates collapse to zero, which stays admissible whatever the
	/// portal topology
	pub(crate) fn estimate(&self, grid: GridId, cell: CellIndex) -> i32 {
		if grid == self.goal.0 {
			(self.heuristic)(cell, self.goal.1)
		} else {
			0
		}
	}
	/// Get the lifecycle status
	pub fn get_status(&self) -> SearchStatus {
		self.status
	}
	/// Get the resolved goal
	pub fn get_goal(&self) -> (GridId, CellIndex) {
		self.goal
	}
	/// Get the node arena
	pub fn get_nodes(&self) -> &Vec<SearchNode> {
		&self.nodes
	}
	/// Cells currently awaiting expansion, for observing a paused search
	pub fn open_cells(&self) -> Vec<(GridId, CellIndex)> {
		self.open
			.iter_nodes()
			.map(|index| (self.nodes[index].grid, self.nodes[index].cell))
			.collect()
	}
	/// Cells already expanded, for observing a paused search
	pub fn closed_cells(&self) -> Vec<(GridId, CellIndex)> {
		self.nodes
			.iter()
			.filter(|node| node.closed)
			.map(|node| (node.grid, node.cell))
			.collect()
	}
	/// Arena node by index
	pub(crate) fn node(&self, index: usize) -> &SearchNode {
		&self.nodes[index]
	}
	/// Options of the request being served
	pub(crate) fn node_request_options(&self) -> &PathRequestOptions {
		self.request.get_options()
	}
	/// Record a discovered or improved route to a cell. Stale open entries
	/// are left in the heap and skipped on pop via the closed flag
	pub(crate) fn relax(
		&mut self,
		key: (GridId, CellIndex),
		tentative_g: i32,
		predecessor: usize,
		portal: bool,
	) {
		match self.lookup.get(&key) {
			Some(&existing) => {
				let node = &mut self.nodes[existing];
				if !node.closed && tentative_g < node.g {
					node.g = tentative_g;
					node.predecessor = Some(predecessor);
					node.portal = portal;
					let f = node.g + node.h;
					self.open.push(f, existing);
				}
			}
			None => {
				let h = self.estimate(key.0, key.1);
				let index = self.nodes.len();
				self.nodes.push(SearchNode {
					grid: key.0,
					cell: key.1,
					g: tentative_g,
					h,
					closed: false,
					predecessor: Some(predecessor),
					portal,
				});
				self.lookup.insert(key, index);
				self.open.push(tentative_g + h, index);
			}
		}
	}
	/// Settle the search with a terminal classification
	fn settle(&mut self, status: PathResultStatus, endpoint: Option<usize>, world: &NavWorld) {
		if let Some(endpoint) = endpoint {
			self.path = Some(self.reconstruct(endpoint, world));
		}
		self.status = SearchStatus::Settled(status);
	}
	/// Walk predecessor links from an endpoint back to the start, reverse
	/// into travel order and optionally string-pull the result
	fn reconstruct(&self, endpoint: usize, world: &NavWorld) -> Path {
		let mut nodes = Vec::new();
		let mut cursor = Some(endpoint);
		while let Some(index) = cursor {
			let node = &self.nodes[index];
			let position = world
				.get_grid(node.grid)
				.map(|grid| grid.get_matrix().get_cell_at(node.cell).get_position())
				.unwrap_or_default();
			nodes.push(PathNode::new(
				node.grid,
				node.cell,
				position,
				node.g,
				node.portal,
			));
			cursor = node.predecessor;
		}
		nodes.reverse();
		let options = self.request.get_options();
		if options.smooth {
			smooth_path(
				&mut nodes,
				world,
				options.capabilities,
				options.clearance,
			);
		}
		Path::new(nodes)
	}
	/// Expand a single node. Returns the updated status, which stays
	/// [SearchStatus::Expanding] while nodes remain
	pub fn step_once(&mut self, world: &NavWorld) -> SearchStatus {
		if let SearchStatus::Settled(_) = self.status {
			return self.status;
		}
		// a superseded request is abandoned at the first opportunity
		if self.request.has_decayed() {
			self.settle(PathResultStatus::Decayed, None, world);
			return self.status;
		}
		// pop past stale heap entries for already-closed nodes
		let current = loop {
			match self.open.pop() {
				Some(index) => {
					if !self.nodes[index].closed {
						break index;
					}
				}
				None => {
					// exhausted: hand back the closest approach if the
					// request accepts one
					let fallback = self.best_towards_goal;
					if self.request.get_options().allow_partial && fallback.is_some() {
						self.settle(PathResultStatus::CompletePartial, fallback, world);
					} else {
						self.settle(PathResultStatus::NoRouteExists, None, world);
					}
					return self.status;
				}
			}
		};
		self.nodes[current].closed = true;
		let (grid_id, cell) = (self.nodes[current].grid, self.nodes[current].cell);
		if (grid_id, cell) == self.goal {
			let status = if self.substituted_goal {
				PathResultStatus::DestinationBlocked
			} else {
				PathResultStatus::Complete
			};
			self.settle(status, Some(current), world);
			return self.status;
		}
		match self.best_towards_goal {
			Some(best) if self.nodes[best].h <= self.nodes[current].h => {}
			_ => self.best_towards_goal = Some(current),
		}
		let Some(grid) = world.get_grid(grid_id) else {
			self.error = Some(format!("Grid {:?} vanished mid-search", grid_id));
			error!("Grid {:?} vanished mid-search", grid_id);
			self.settle(PathResultStatus::Failed, None, world);
			return self.status;
		};
		// a popped portal cell contributes a successor on the far side of
		// its edge, the only way the search leaves this grid
		if let Some(portal) = grid.get_portals().get_portal_from_cell(cell) {
			let target_grid_id = portal.get_target_grid();
			let target_cell = portal.get_target_cell();
			match world.get_grid(target_grid_id) {
				Some(target_grid) => {
					let matrix = target_grid.get_matrix();
					if target_cell.get_column() >= matrix.get_columns()
						|| target_cell.get_row() >= matrix.get_rows()
					{
						let message = format!(
							"Portal at {:?} targets cell {:?} outside grid {:?}",
							cell, target_cell, target_grid_id
						);
						error!("{}", message);
						self.error = Some(message);
						self.settle(PathResultStatus::Failed, None, world);
						return self.status;
					}
					let options = *self.request.get_options();
					let target = matrix.get_cell_at(target_cell);
					if target.is_occupiable(options.capabilities, options.clearance, false) {
						let tentative_g = self.nodes[current].g
							+ PORTAL_MOVE_COST * target.get_cost() as i32;
						self.relax((target_grid_id, target_cell), tentative_g, current, true);
					}
				}
				None => {
					let message = format!(
						"Portal at {:?} targets missing grid {:?}",
						cell, target_grid_id
					);
					error!("{}", message);
					self.error = Some(message);
					self.settle(PathResultStatus::Failed, None, world);
					return self.status;
				}
			}
		}
		let algorithm = self.request.get_options().algorithm;
		match algorithm {
			SearchAlgorithm::AStar => self.expand_astar(world, current, grid_id, cell),
			SearchAlgorithm::JumpPoint => expand_jump_points(self, world, current, grid_id, cell),
		}
		self.status
	}
	/// Plain A* successor generation: every walkable neighbour, relaxed
	/// with terrain-weighted step costs
	fn expand_astar(&mut self, world: &NavWorld, current: usize, grid_id: GridId, cell: CellIndex) {
		let options = *self.request.get_options();
		let Some(grid) = world.get_grid(grid_id) else {
			return;
		};
		let matrix = grid.get_matrix();
		let neighbours = if options.allow_diagonal {
			GridDirection::get_all_cell_neighbours(cell, matrix.get_columns(), matrix.get_rows())
		} else {
			GridDirection::get_orthogonal_cell_neighbours(
				cell,
				matrix.get_columns(),
				matrix.get_rows(),
			)
		};
		let current_g = self.nodes[current].g;
		for neighbour in neighbours {
			let target = matrix.get_cell_at(neighbour);
			if !target.is_occupiable(options.capabilities, options.clearance, false) {
				continue;
			}
			let tentative_g = current_g + move_cost(cell, neighbour, target.get_cost());
			self.relax((grid_id, neighbour), tentative_g, current, false);
		}
	}
	/// Drive the search to a terminal status and build the result
	pub fn run_to_completion(&mut self, world: &NavWorld) -> PathResult {
		while let SearchStatus::Expanding = self.step_once(world) {}
		self.to_result()
	}
	/// Build the [PathResult] of a settled search. Panics if the search is
	/// still expanding
	pub fn to_result(&mut self) -> PathResult {
		let SearchStatus::Settled(status) = self.status else {
			panic!("Cannot build a result from a search that is still expanding");
		};
		PathResult::new(
			status,
			self.path.take(),
			Arc::clone(&self.request),
			self.error.take(),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	fn open_world(columns: usize, rows: usize) -> NavWorld {
		let mut world = NavWorld::default();
		let matrix = CellMatrix::new(Vec3::ZERO, 1.0, columns, rows);
		world.insert_grid(GridId::new(0), NavGrid::new(matrix));
		world
	}
	fn request(from: Vec3, to: Vec3, options: PathRequestOptions) -> Arc<PathRequest> {
		Arc::new(PathRequest::new(
			from,
			to,
			RequesterId::new(1),
			options,
			Duration::ZERO,
		))
	}
	#[test]
	fn open_grid_diagonal_route() {
		let world = open_world(10, 10);
		let options = PathRequestOptions {
			smooth: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(9.5, 0.0, 9.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::Complete, result.get_status());
		let path = result.get_path().unwrap();
		// pure diagonal, ten nodes including both endpoints
		assert_eq!(10, path.get_nodes().len());
		assert_eq!(9 * DIAGONAL_MOVE_COST, path.get_total_cost());
	}
	#[test]
	fn cardinal_only_route_is_longer() {
		let world = open_world(10, 10);
		let options = PathRequestOptions {
			allow_diagonal: false,
			heuristic: HeuristicKind::Manhattan,
			smooth: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(9.5, 0.0, 9.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::Complete, result.get_status());
		assert_eq!(18 * CARDINAL_MOVE_COST, result.get_total_cost());
	}
	#[test]
	fn start_outside_grid() {
		let world = open_world(10, 10);
		let req = request(
			Vec3::new(-5.0, 0.0, 0.5),
			Vec3::new(5.5, 0.0, 5.5),
			PathRequestOptions::default(),
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::StartOutsideGrid, result.get_status());
		assert!(result.get_path().is_none());
	}
	#[test]
	fn end_outside_grid() {
		let world = open_world(10, 10);
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(55.0, 0.0, 5.5),
			PathRequestOptions::default(),
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::EndOutsideGrid, result.get_status());
	}
	#[test]
	fn wall_forces_detour() {
		let mut world = open_world(10, 10);
		{
			let matrix = world
				.get_grid_mut(GridId::new(0))
				.unwrap()
				.get_matrix_mut();
			// wall across columns 0..9 at row 5, gap at column 9
			for column in 0..9 {
				matrix.set_cell_passable(
					CellIndex::new(column, 5),
					AttributeMask::NONE,
					Duration::ZERO,
				);
			}
		}
		let options = PathRequestOptions {
			smooth: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(0.5, 0.0, 9.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::Complete, result.get_status());
		let path = result.get_path().unwrap();
		// the route must pass through the gap at column 9
		assert!(path
			.get_nodes()
			.iter()
			.any(|node| node.get_cell().get_column() == 9));
	}
	#[test]
	fn sealed_goal_reports_no_route() {
		let mut world = open_world(10, 10);
		{
			let matrix = world
				.get_grid_mut(GridId::new(0))
				.unwrap()
				.get_matrix_mut();
			for column in 0..10 {
				matrix.set_cell_passable(
					CellIndex::new(column, 5),
					AttributeMask::NONE,
					Duration::ZERO,
				);
			}
		}
		let options = PathRequestOptions {
			navigate_to_nearest_if_blocked: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(0.5, 0.0, 9.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::NoRouteExists, result.get_status());
	}
	#[test]
	fn sealed_goal_partial_route_when_accepted() {
		let mut world = open_world(10, 10);
		{
			let matrix = world
				.get_grid_mut(GridId::new(0))
				.unwrap()
				.get_matrix_mut();
			for column in 0..10 {
				matrix.set_cell_passable(
					CellIndex::new(column, 5),
					AttributeMask::NONE,
					Duration::ZERO,
				);
			}
		}
		let options = PathRequestOptions {
			allow_partial: true,
			navigate_to_nearest_if_blocked: false,
			smooth: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(0.5, 0.0, 9.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::CompletePartial, result.get_status());
		let path = result.get_path().unwrap();
		// the closest approach sits on the near side of the wall
		assert_eq!(4, path.last().unwrap().get_cell().get_row());
	}
	#[test]
	fn blocked_destination_substituted_within_radius() {
		let mut world = open_world(10, 10);
		{
			let matrix = world
				.get_grid_mut(GridId::new(0))
				.unwrap()
				.get_matrix_mut();
			matrix.set_cell_passable(CellIndex::new(9, 9), AttributeMask::NONE, Duration::ZERO);
		}
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(9.5, 0.0, 9.5),
			PathRequestOptions::default(),
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::DestinationBlocked, result.get_status());
		let path = result.get_path().unwrap();
		let end = path.last().unwrap().get_cell();
		assert!(end.ring_distance(&CellIndex::new(9, 9)) <= 3);
	}
	#[test]
	fn blocked_destination_no_alternative() {
		let mut world = open_world(10, 10);
		{
			let matrix = world
				.get_grid_mut(GridId::new(0))
				.unwrap()
				.get_matrix_mut();
			matrix.set_cell_passable(CellIndex::new(9, 9), AttributeMask::NONE, Duration::ZERO);
		}
		let options = PathRequestOptions {
			nearest_radius: 0,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(9.5, 0.0, 9.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::DestinationBlocked, result.get_status());
		assert!(result.get_path().is_none());
	}
	#[test]
	fn decay_before_first_step_aborts() {
		let world = open_world(10, 10);
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(9.5, 0.0, 9.5),
			PathRequestOptions::default(),
		);
		let mut search = PathSearch::new(&world, req.clone());
		req.mark_decayed();
		let status = search.step_once(&world);
		assert_eq!(
			SearchStatus::Settled(PathResultStatus::Decayed),
			status
		);
		// no expansion happened
		assert!(search.closed_cells().is_empty());
	}
	#[test]
	fn decay_mid_search_aborts() {
		let world = open_world(10, 10);
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(9.5, 0.0, 9.5),
			PathRequestOptions::default(),
		);
		let mut search = PathSearch::new(&world, req.clone());
		assert_eq!(SearchStatus::Expanding, search.step_once(&world));
		assert_eq!(SearchStatus::Expanding, search.step_once(&world));
		req.mark_decayed();
		let status = search.step_once(&world);
		assert_eq!(SearchStatus::Settled(PathResultStatus::Decayed), status);
	}
	#[test]
	fn step_once_exposes_frontier() {
		let world = open_world(10, 10);
		let options = PathRequestOptions {
			smooth: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(9.5, 0.0, 9.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		search.step_once(&world);
		// the start cell is closed and its neighbours are on the frontier
		assert_eq!(1, search.closed_cells().len());
		assert_eq!(3, search.open_cells().len());
	}
	#[test]
	fn route_crosses_portal_between_grids() {
		let mut world = NavWorld::default();
		let matrix_a = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		let matrix_b = CellMatrix::new(Vec3::new(100.0, 0.0, 0.0), 1.0, 10, 10);
		let mut grid_a = NavGrid::new(matrix_a);
		grid_a.get_portals_mut().add(Portal::new(
			CellIndex::new(9, 4),
			GridId::new(1),
			CellIndex::new(0, 4),
			PortalTransition::Instant,
		));
		world.insert_grid(GridId::new(0), grid_a);
		world.insert_grid(GridId::new(1), NavGrid::new(matrix_b));
		let options = PathRequestOptions {
			smooth: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 4.5),
			Vec3::new(105.5, 0.0, 4.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::Complete, result.get_status());
		let path = result.get_path().unwrap();
		// exactly one node is flagged as the far side of a portal hop
		let portal_nodes: Vec<&PathNode> = path
			.get_nodes()
			.iter()
			.filter(|node| node.is_portal())
			.collect();
		assert_eq!(1, portal_nodes.len());
		assert_eq!(GridId::new(1), portal_nodes[0].get_grid());
		assert_eq!(CellIndex::new(0, 4), portal_nodes[0].get_cell());
	}
	#[test]
	fn disabled_portal_blocks_crossing() {
		let mut world = NavWorld::default();
		let matrix_a = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		let matrix_b = CellMatrix::new(Vec3::new(100.0, 0.0, 0.0), 1.0, 10, 10);
		let mut grid_a = NavGrid::new(matrix_a);
		grid_a.get_portals_mut().add(Portal::new(
			CellIndex::new(9, 4),
			GridId::new(1),
			CellIndex::new(0, 4),
			PortalTransition::Instant,
		));
		grid_a
			.get_portals_mut()
			.get_portal_from_cell_mut(CellIndex::new(9, 4))
			.unwrap()
			.set_enabled(false);
		world.insert_grid(GridId::new(0), grid_a);
		world.insert_grid(GridId::new(1), NavGrid::new(matrix_b));
		let req = request(
			Vec3::new(0.5, 0.0, 4.5),
			Vec3::new(105.5, 0.0, 4.5),
			PathRequestOptions::default(),
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::NoRouteExists, result.get_status());
	}
	#[test]
	fn portal_to_missing_grid_fails_with_diagnostic() {
		let mut world = NavWorld::default();
		let mut matrix_a = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		// wall the goal off so the only hope is the corrupt portal, which
		// the search must pop on its way to exhaustion
		for row in 0..10 {
			matrix_a.set_cell_passable(CellIndex::new(5, row), AttributeMask::NONE, Duration::ZERO);
		}
		let mut grid_a = NavGrid::new(matrix_a);
		grid_a.get_portals_mut().add(Portal::new(
			CellIndex::new(4, 4),
			GridId::new(7),
			CellIndex::new(0, 4),
			PortalTransition::Instant,
		));
		world.insert_grid(GridId::new(0), grid_a);
		let req = request(
			Vec3::new(0.5, 0.0, 4.5),
			Vec3::new(9.5, 0.0, 4.5),
			PathRequestOptions::default(),
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::Failed, result.get_status());
		assert!(result.get_error().is_some());
	}
	#[test]
	fn costs_non_decreasing_along_route() {
		let mut world = open_world(10, 10);
		{
			let matrix = world
				.get_grid_mut(GridId::new(0))
				.unwrap()
				.get_matrix_mut();
			// a patch of heavy terrain in the middle
			for column in 3..7 {
				for row in 3..7 {
					matrix.set_cell_cost(CellIndex::new(column, row), 8, Duration::ZERO);
				}
			}
		}
		let options = PathRequestOptions {
			smooth: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(9.5, 0.0, 9.5),
			options,
		);
		let mut search = PathSearch::new(&world, req);
		let result = search.run_to_completion(&world);
		let path = result.get_path().unwrap();
		for pair in path.get_nodes().windows(2) {
			assert!(pair[0].get_g() <= pair[1].get_g());
		}
		assert_eq!(
			path.get_nodes().last().unwrap().get_g(),
			result.get_total_cost()
		);
	}
	#[test]
	fn clamp_pre_processor_recovers_outside_start() {
		let world = open_world(10, 10);
		let req = request(
			Vec3::new(-2.0, 0.0, 4.5),
			Vec3::new(8.5, 0.0, 4.5),
			PathRequestOptions::default(),
		);
		let clamp = ClampToGrid;
		let processors: [&dyn RequestPreProcessor; 1] = [&clamp];
		let mut search = PathSearch::with_pre_processors(&world, req, &processors);
		let result = search.run_to_completion(&world);
		assert_eq!(PathResultStatus::Complete, result.get_status());
	}
	#[test]
	fn capability_mask_respected() {
		let mut world = open_world(10, 10);
		{
			let matrix = world
				.get_grid_mut(GridId::new(0))
				.unwrap()
				.get_matrix_mut();
			// a river crossing the grid, passable only to amphibians
			for column in 0..10 {
				matrix.set_cell_passable(
					CellIndex::new(column, 5),
					AttributeMask::AMPHIBIOUS,
					Duration::ZERO,
				);
			}
		}
		let amphibious = PathRequestOptions {
			capabilities: AttributeMask::GROUND.union(AttributeMask::AMPHIBIOUS),
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(0.5, 0.0, 9.5),
			amphibious,
		);
		let mut search = PathSearch::new(&world, req);
		assert_eq!(
			PathResultStatus::Complete,
			search.run_to_completion(&world).get_status()
		);
		let walker = PathRequestOptions {
			navigate_to_nearest_if_blocked: false,
			..Default::default()
		};
		let req = request(
			Vec3::new(0.5, 0.0, 0.5),
			Vec3::new(0.5, 0.0, 9.5),
			walker,
		);
		let mut search = PathSearch::new(&world, req);
		assert_eq!(
			PathResultStatus::NoRouteExists,
			search.run_to_completion(&world).get_status()
		);
	}
}
