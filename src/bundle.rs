//!
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Everything the navigation systems need on the world entity: the grids,
/// the request queue and the result-processing chain
#[derive(Bundle)]
pub struct NavWorldBundle {
	/// The navigable grids
	world: NavWorld,
	/// Request/result hand-off
	queue: PathRequestQueue,
	/// Corrective policy chain
	processors: ResultProcessors,
}

impl NavWorldBundle {
	/// Create a new instance of [NavWorldBundle] around a single
	/// ground-level grid of `columns` by `rows` cells
	pub fn new(origin: Vec3, cell_size: f32, columns: usize, rows: usize) -> Self {
		let matrix = CellMatrix::new(origin, cell_size, columns, rows);
		let mut world = NavWorld::default();
		world.insert_grid(GridId::new(0), NavGrid::new(matrix));
		NavWorldBundle {
			world,
			queue: PathRequestQueue::default(),
			processors: ResultProcessors::standard(),
		}
	}
	/// Create a new instance of [NavWorldBundle] from prepared grids
	pub fn from_world(world: NavWorld) -> Self {
		NavWorldBundle {
			world,
			queue: PathRequestQueue::default(),
			processors: ResultProcessors::standard(),
		}
	}
	/// Create a new instance of [NavWorldBundle] where the single grid's
	/// cost weights are derived from disk
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> Self {
		let matrix = CellMatrix::from_ron(path.to_string());
		let mut world = NavWorld::default();
		world.insert_grid(GridId::new(0), NavGrid::new(matrix));
		NavWorldBundle {
			world,
			queue: PathRequestQueue::default(),
			processors: ResultProcessors::standard(),
		}
	}
}

/// Everything a steering-driven agent entity needs beside its
/// host-supplied [Transform]
#[derive(Bundle)]
pub struct NavAgentBundle {
	/// Route state and the steering pipeline
	agent: NavAgent,
	/// Host-owned motion state the pipeline reads
	motion: AgentMotion,
	/// Pipeline output the host integrates
	desired: DesiredMotion,
}

impl NavAgentBundle {
	/// Create a new instance of [NavAgentBundle]
	pub fn new(params: NavAgentParams) -> Self {
		NavAgentBundle {
			agent: NavAgent::new(params),
			motion: AgentMotion::default(),
			desired: DesiredMotion::default(),
		}
	}
}
