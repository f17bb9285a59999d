//! Height and slope following. The behaviour samples terrain a little way
//! ahead of the agent, compares the rise against what the agent can climb
//! and either tracks the slope with a vertical correction or refuses it -
//! an impassable grade gets no correction at all, leaving the agent to run
//! into the hillside rather than glide up it.
//!
//! Sampling is split in two: a [TerrainSource] is where heights come from
//! (the host's raycast, or the grid's own height lookup) and a
//! [TerrainSampler] is how the ground around a point is probed (one sample,
//! or a box of samples keeping the highest). A short history of pending
//! high points carries the steepest recently-seen ground, which stops the
//! agent clipping into the crest when a steep grade flattens out.
//!

use std::collections::VecDeque;

use crate::prelude::*;
use bevy::prelude::*;

/// Number of recent height targets retained for grade smoothing
const PENDING_HIGH_POINT_WINDOW: usize = 4;
/// Spring stiffness pulling the agent to the target height
const VERTICAL_STIFFNESS: f32 = 25.0;
/// Damping on the vertical rate
const VERTICAL_DAMPING: f32 = 8.0;

/// Where height samples come from. The grid's own lookup satisfies this;
/// a host engine may instead answer from a physics raycast
pub trait TerrainSource {
	/// Terrain height under a world position, [None] off the terrain
	fn height_at(&self, position: Vec3) -> Option<f32>;
}

/// [TerrainSource] answering from a grid's height lookup, the precomputed
/// height-map flavour of sampling
pub struct GridHeightSource<'a> {
	/// Matrix used to translate world positions to height coordinates
	matrix: &'a CellMatrix,
	/// The height data itself
	heights: &'a HeightLookup,
}

impl<'a> GridHeightSource<'a> {
	/// Create a new instance of [GridHeightSource] over a grid
	pub fn new(grid: &'a NavGrid) -> Self {
		GridHeightSource {
			matrix: grid.get_matrix(),
			heights: grid.get_heights(),
		}
	}
}

impl TerrainSource for GridHeightSource<'_> {
	fn height_at(&self, position: Vec3) -> Option<f32> {
		let index = self.matrix.get_cell_index_from_position(position)?;
		self.heights
			.try_get_height(index.get_column() as i32, index.get_row() as i32)
	}
}

/// How the ground around a probe point is sampled
#[derive(Clone, Copy, Debug, Default)]
pub enum TerrainSampler {
	/// One sample at the probe point, the single-ray flavour
	#[default]
	SinglePoint,
	/// Five samples, centre and the corners of a box, keeping the highest.
	/// Wide agents use this so a boulder under one corner still registers
	MultiPoint {
		/// Half the box edge length
		half_extent: f32,
	},
}

impl TerrainSampler {
	/// Probe the ground around a point. [None] when every sample missed the
	/// terrain
	pub fn sample(&self, source: &dyn TerrainSource, position: Vec3) -> Option<f32> {
		match self {
			TerrainSampler::SinglePoint => source.height_at(position),
			TerrainSampler::MultiPoint { half_extent } => {
				let offsets = [
					Vec3::ZERO,
					Vec3::new(*half_extent, 0.0, *half_extent),
					Vec3::new(*half_extent, 0.0, -half_extent),
					Vec3::new(-half_extent, 0.0, *half_extent),
					Vec3::new(-half_extent, 0.0, -half_extent),
				];
				offsets
					.iter()
					.filter_map(|offset| source.height_at(position + *offset))
					.fold(None, |highest, sample| match highest {
						Some(value) if value >= sample => Some(value),
						_ => Some(sample),
					})
			}
		}
	}
}

/// Adjusts vertical motion to follow climbable ground ahead of the agent
#[derive(Debug)]
pub struct TerrainFollowing {
	/// How the ground is probed
	sampler: TerrainSampler,
	/// Seconds ahead the agent's position is predicted for the probe
	lookahead_time: f32,
	/// Recent height targets, highest wins during grade transitions
	pending_high_points: VecDeque<f32>,
}

impl Default for TerrainFollowing {
	fn default() -> Self {
		TerrainFollowing {
			sampler: TerrainSampler::SinglePoint,
			lookahead_time: 0.25,
			pending_high_points: VecDeque::with_capacity(PENDING_HIGH_POINT_WINDOW),
		}
	}
}

impl TerrainFollowing {
	/// Create a new instance of [TerrainFollowing] with a given sampler
	pub fn new(sampler: TerrainSampler, lookahead_time: f32) -> Self {
		TerrainFollowing {
			sampler,
			lookahead_time,
			pending_high_points: VecDeque::with_capacity(PENDING_HIGH_POINT_WINDOW),
		}
	}
	/// Record a height target, evicting the oldest past the window
	fn remember(&mut self, height: f32) {
		if self.pending_high_points.len() == PENDING_HIGH_POINT_WINDOW {
			self.pending_high_points.pop_front();
		}
		self.pending_high_points.push_back(height);
	}
	/// The highest recently-seen target
	fn pending_high(&self) -> Option<f32> {
		self.pending_high_points
			.iter()
			.copied()
			.fold(None, |highest, sample| match highest {
				Some(value) if value >= sample => Some(value),
				_ => Some(sample),
			})
	}
}

impl SteeringBehavior for TerrainFollowing {
	fn desired_steering(&mut self, input: &SteeringInput) -> SteeringOutput {
		let Some(source) = input.terrain else {
			return SteeringOutput::default();
		};
		let predicted =
			input.position + input.velocity.with_y(0.0) * self.lookahead_time;
		let Some(sampled) = self.sampler.sample(source, predicted) else {
			return SteeringOutput::default();
		};
		let rise = sampled - input.position.y;
		let run = (predicted - input.position).with_y(0.0).length().max(0.05);
		let grade = rise.atan2(run);
		let params = input.params;
		if rise > params.step_height && grade > params.max_climb_angle {
			// impassable: no vertical correction, the agent collides with
			// the slope instead of climbing it
			return SteeringOutput::default();
		}
		self.remember(sampled);
		let target_height = self.pending_high().unwrap_or(sampled);
		let error = target_height - input.position.y;
		let acceleration_y =
			error * VERTICAL_STIFFNESS - input.velocity.y * VERTICAL_DAMPING;
		SteeringOutput {
			acceleration: Vec3::new(0.0, acceleration_y, 0.0),
			angular_acceleration: 0.0,
			has_arrived: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Test source answering from a closure-like table: a flat plain with a
	/// step up beyond `x = 5`
	struct SteppedPlain {
		step_height: f32,
	}
	impl TerrainSource for SteppedPlain {
		fn height_at(&self, position: Vec3) -> Option<f32> {
			if position.x > 5.0 {
				Some(self.step_height)
			} else {
				Some(0.0)
			}
		}
	}
	fn params(max_climb_angle: f32) -> NavAgentParams {
		NavAgentParams {
			max_climb_angle,
			step_height: 0.3,
			..Default::default()
		}
	}
	fn input<'a>(
		params: &'a NavAgentParams,
		source: &'a dyn TerrainSource,
		position: Vec3,
		velocity: Vec3,
	) -> SteeringInput<'a> {
		SteeringInput {
			position,
			velocity,
			yaw: 0.0,
			angular_velocity: 0.0,
			delta_time: 0.1,
			params,
			target: None,
			destination: None,
			look_target: None,
			neighbours: &[],
			terrain: Some(source),
		}
	}
	#[test]
	fn climbable_rise_gets_vertical_push() {
		let source = SteppedPlain { step_height: 0.5 };
		let params = params(std::f32::consts::FRAC_PI_3);
		let mut follow = TerrainFollowing::default();
		// running east towards the step at 4 m/s, probe lands past it
		let out = follow.desired_steering(&input(
			&params,
			&source,
			Vec3::new(5.0, 0.0, 0.0),
			Vec3::new(4.0, 0.0, 0.0),
		));
		assert!(out.acceleration.y > 0.0);
	}
	#[test]
	fn impassable_grade_gets_no_correction() {
		let source = SteppedPlain { step_height: 10.0 };
		// a shallow climber facing a cliff
		let params = params(0.3);
		let mut follow = TerrainFollowing::default();
		let out = follow.desired_steering(&input(
			&params,
			&source,
			Vec3::new(5.0, 0.0, 0.0),
			Vec3::new(4.0, 0.0, 0.0),
		));
		assert_eq!(Vec3::ZERO, out.acceleration);
	}
	#[test]
	fn descent_tracked_downward() {
		struct Drop;
		impl TerrainSource for Drop {
			fn height_at(&self, position: Vec3) -> Option<f32> {
				if position.x > 5.0 {
					Some(-2.0)
				} else {
					Some(0.0)
				}
			}
		}
		let source = Drop;
		let params = params(std::f32::consts::FRAC_PI_3);
		let mut follow = TerrainFollowing::default();
		let out = follow.desired_steering(&input(
			&params,
			&source,
			Vec3::new(5.0, 0.0, 0.0),
			Vec3::new(4.0, 0.0, 0.0),
		));
		assert!(out.acceleration.y < 0.0);
	}
	#[test]
	fn pending_high_points_smooth_grade_change() {
		let source = SteppedPlain { step_height: 0.5 };
		let params = params(std::f32::consts::FRAC_PI_3);
		let mut follow = TerrainFollowing::default();
		// first tick sees the high step ahead
		follow.desired_steering(&input(
			&params,
			&source,
			Vec3::new(5.0, 0.0, 0.0),
			Vec3::new(4.0, 0.0, 0.0),
		));
		// second tick the probe is back on flat ground, yet the remembered
		// high point keeps pulling upward so the crest isn't clipped
		let out = follow.desired_steering(&input(
			&params,
			&source,
			Vec3::new(2.0, 0.0, 0.0),
			Vec3::new(4.0, 0.0, 0.0),
		));
		assert!(out.acceleration.y > 0.0);
	}
	#[test]
	fn multi_point_sampler_keeps_highest() {
		let source = SteppedPlain { step_height: 2.0 };
		let sampler = TerrainSampler::MultiPoint { half_extent: 1.0 };
		// centre on the flat side but one corner reaches past the step
		let result = sampler.sample(&source, Vec3::new(4.5, 0.0, 0.0));
		let actual = Some(2.0);
		assert_eq!(actual, result);
	}
	#[test]
	fn grid_height_source_reads_lookup() {
		let matrix = CellMatrix::new(Vec3::ZERO, 1.0, 10, 10);
		let mut grid = NavGrid::with_heights(matrix, HeightLookup::new_quad_tree(10, 10, 0.0));
		grid.get_heights_mut().add(3, 4, 2.5);
		let source = GridHeightSource::new(&grid);
		assert_eq!(Some(2.5), source.height_at(Vec3::new(3.5, 0.0, 4.5)));
		assert_eq!(None, source.height_at(Vec3::new(-1.0, 0.0, 4.5)));
	}
}
